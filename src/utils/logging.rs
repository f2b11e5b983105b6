/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchResult;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认 info。重复调用是安全的。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 重复采样模式");
    info!("🤖 模型: {} ({})", config.model_name, config.api_base_url);
    info!("🖼️ 图片: {}", config.image_path);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_size`: 样本数量
/// - `max_concurrent`: 最大并发数
pub fn log_batch_start(batch_size: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始采样: 共 {} 个样本", batch_size);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 打印每个样本的摘要
pub fn log_batch_summary(batch: &BatchResult) {
    info!("\n{}", "─".repeat(60));
    for outcome in batch {
        let marker = if outcome.is_success() { "✓" } else { "✗" };
        info!(
            "{} [样本 {}] {}",
            marker,
            outcome.id,
            truncate_text(&outcome.result.response_text().replace('\n', " "), 80)
        );
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `batch`: 完成的批次
/// - `output_file`: 结果文件路径（如果写了文件）
pub fn print_final_stats(batch: &BatchResult, output_file: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部采样完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", batch.success_count(), batch.len());
    info!(
        "❌ 失败: {} ({:.1}%)",
        batch.failure_count(),
        batch.failure_rate() * 100.0
    );
    info!("{}", "=".repeat(60));
    if let Some(path) = output_file {
        info!("\n结果已保存至: {}", path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
