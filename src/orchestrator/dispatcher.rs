//! 样本调度器
//!
//! 为一批中的每个样本 ID 立即启动一个 tokio 任务，
//! 每个任务只产出一个 `SampleOutcome`，完成后马上送进收集器的通道。
//!
//! - **准入闸门**：Semaphore 限制同时在途的外部请求数量
//! - **超时**：单个样本超过期限时产出 `Failure("timeout")`
//! - **不阻塞调用方**：`dispatch` 返回时所有任务都已启动，但不保证已完成

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::LlmError;
use crate::models::{SampleImage, SampleOutcome, SampleRequest};
use crate::services::VisionInference;

/// 调度参数
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// 同时在途的调用上限，None 表示整批同时发出
    pub max_concurrent: Option<usize>,
    /// 单个样本的等待上限，None 表示一直等
    pub sample_timeout: Option<Duration>,
}

/// 样本调度器
pub struct SampleDispatcher {
    adapter: Arc<dyn VisionInference>,
    options: DispatchOptions,
}

impl SampleDispatcher {
    pub fn new(adapter: Arc<dyn VisionInference>, options: DispatchOptions) -> Self {
        Self { adapter, options }
    }

    /// 启动 `batch_size` 个样本任务，ID 为 `1..=batch_size`
    ///
    /// 每个任务持有 `sink` 的一个克隆；全部任务结束后通道自然关闭。
    pub fn dispatch(
        &self,
        batch_size: usize,
        image: SampleImage,
        sink: mpsc::Sender<SampleOutcome>,
    ) -> DispatchHandle {
        let permits = self
            .options
            .max_concurrent
            .unwrap_or(batch_size)
            .clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let sample_timeout = self.options.sample_timeout;

        debug!(
            "启动 {} 个样本任务，并发上限 {}，超时 {:?}",
            batch_size, permits, sample_timeout
        );

        let mut handles = Vec::with_capacity(batch_size);

        for id in 1..=batch_size {
            let adapter = Arc::clone(&self.adapter);
            let semaphore = Arc::clone(&semaphore);
            let image = image.clone();
            let sink = sink.clone();

            let handle = tokio::spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        info!("[样本 {}] 🚀 开始请求...", id);
                        run_sample(adapter.as_ref(), SampleRequest::new(id, image), sample_timeout)
                            .await
                    }
                    Err(e) => SampleOutcome::failure(id, format!("无法获取并发许可: {}", e)),
                };

                if sink.send(outcome).await.is_err() {
                    warn!("[样本 {}] 收集器已关闭，结果被丢弃", id);
                }
            });
            handles.push((id, handle));
        }

        DispatchHandle { handles }
    }
}

async fn run_sample(
    adapter: &dyn VisionInference,
    request: SampleRequest,
    sample_timeout: Option<Duration>,
) -> SampleOutcome {
    let id = request.id;

    let outcome = match sample_timeout {
        Some(limit) => match tokio::time::timeout(limit, adapter.invoke(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("[样本 {}] ⏱️ 超过 {:?} 未返回", id, limit);
                SampleOutcome::failure(id, LlmError::Timeout.to_string())
            }
        },
        None => adapter.invoke(request).await,
    };

    if outcome.id != id {
        warn!(
            "[样本 {}] 适配器返回了错误的样本 ID {}，按 {} 处理",
            id, outcome.id, id
        );
    }

    match &outcome.result {
        crate::models::SampleResult::Success(_) => info!("[样本 {}] ✓ 完成", id),
        crate::models::SampleResult::Failure(reason) => {
            error!("[样本 {}] ❌ 失败: {}", id, reason)
        }
    }

    SampleOutcome {
        id,
        result: outcome.result,
    }
}

/// 已启动任务的句柄
#[derive(Debug)]
pub struct DispatchHandle {
    handles: Vec<(usize, JoinHandle<()>)>,
}

impl DispatchHandle {
    /// 已启动的任务数量
    pub fn started(&self) -> usize {
        self.handles.len()
    }

    /// 等待全部任务结束，返回异常结束（panic / 被取消）的数量
    pub async fn join(self) -> usize {
        let (ids, handles): (Vec<usize>, Vec<JoinHandle<()>>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;

        ids.into_iter()
            .zip(results)
            .filter_map(|(id, result)| result.err().map(|e| (id, e)))
            .inspect(|(id, e)| error!("[样本 {}] 任务执行失败: {}", id, e))
            .count()
    }
}
