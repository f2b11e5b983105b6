//! 批量编排器 - 编排层
//!
//! ## 职责
//!
//! 把调度器和收集器组装起来，是核心逻辑唯一的对外入口：
//!
//! 1. 分配结果通道和固定长度的结果槽位
//! 2. 启动调度器（所有样本任务立即启动）
//! 3. 驱动收集器直到收满
//! 4. 等待任务句柄，返回有序的 `BatchResult`
//!
//! 单个样本的失败保存在 `BatchResult` 里，不会变成批次级别的错误。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{BatchResult, SampleImage};
use crate::orchestrator::collector::ResultCollector;
use crate::orchestrator::dispatcher::{DispatchOptions, SampleDispatcher};
use crate::services::VisionInference;

/// 批量编排器
pub struct BatchOrchestrator {
    dispatcher: SampleDispatcher,
}

impl BatchOrchestrator {
    pub fn new(adapter: Arc<dyn VisionInference>, options: DispatchOptions) -> Self {
        Self {
            dispatcher: SampleDispatcher::new(adapter, options),
        }
    }

    /// 对同一张图片运行 `batch_size` 个样本
    ///
    /// 只有调用参数本身不合法时才返回错误。
    pub async fn run(&self, batch_size: usize, image: SampleImage) -> AppResult<BatchResult> {
        if batch_size == 0 {
            return Err(AppError::config_invalid("batch_size", "必须大于 0"));
        }
        if image.is_empty() {
            return Err(AppError::config_invalid("image", "图片内容为空"));
        }

        let (sink, mut intake) = mpsc::channel(batch_size);
        let collector = ResultCollector::new(batch_size);

        let handle = self.dispatcher.dispatch(batch_size, image, sink);
        info!("📤 已启动 {} 个样本任务，等待结果...", handle.started());

        let batch = collector.collect(&mut intake).await;

        let abnormal = handle.join().await;
        if abnormal > 0 {
            warn!("⚠️ {} 个样本任务异常结束", abnormal);
        }

        Ok(batch)
    }
}
