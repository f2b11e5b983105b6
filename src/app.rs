//! 应用外壳
//!
//! 读取配置和图片 → 运行一整批采样 → 输出 JSON 结果和统计

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{BatchResult, FileImageSource, ImageSource, SampleImage};
use crate::orchestrator::{BatchOrchestrator, DispatchOptions};
use crate::services::{VisionInference, VisionService};
use crate::utils::logging::{log_batch_start, log_batch_summary, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    image: SampleImage,
    orchestrator: BatchOrchestrator,
}

impl App {
    /// 初始化应用：校验配置、读取图片、创建推理服务
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        log_startup(&config);

        let image = FileImageSource::new(&config.image_path)
            .load()
            .await
            .context("读取图片失败")?;

        let service: Arc<dyn VisionInference> = Arc::new(VisionService::new(&config));
        Ok(Self::with_adapter(config, image, service))
    }

    /// 使用指定的推理实现组装应用
    pub fn with_adapter(config: Config, image: SampleImage, adapter: Arc<dyn VisionInference>) -> Self {
        let options = DispatchOptions {
            max_concurrent: Some(config.max_concurrent_samples),
            sample_timeout: config.sample_timeout(),
        };

        Self {
            config,
            image,
            orchestrator: BatchOrchestrator::new(adapter, options),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchResult> {
        log_batch_start(self.config.sample_size, self.config.max_concurrent_samples);

        let batch = self
            .orchestrator
            .run(self.config.sample_size, self.image.clone())
            .await?;

        log_batch_summary(&batch);

        let json = batch.to_json_pretty().map_err(AppError::from)?;
        println!("\n===== FINAL RESULTS =====");
        println!("{}", json);

        if let Some(path) = &self.config.output_file {
            tokio::fs::write(path, &json)
                .await
                .map_err(|e| AppError::file_write_failed(path.clone(), e))?;
            info!("💾 结果已写入: {}", path);
        }

        print_final_stats(&batch, self.config.output_file.as_deref());

        Ok(batch)
    }
}
