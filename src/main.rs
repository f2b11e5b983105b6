use anyhow::Result;
use inquisitor::utils::logging;
use inquisitor::{App, Config};

/// 配置文件路径，文件不存在时只使用环境变量
const DEFAULT_CONFIG_PATH: &str = "inquisitor.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config_path =
        std::env::var("INQUISITOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path).await?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
