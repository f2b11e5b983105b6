//! 结果收集器
//!
//! 按到达顺序接收结果，按样本 ID 放进固定长度的槽位。
//! 只按数量判断完成，不看内容。

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{BatchResult, SampleOutcome};

/// 通道提前关闭时，补在空槽位里的失败原因
pub const MISSING_OUTCOME_REASON: &str = "sample task terminated without reporting";

/// 放置结果失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("样本 ID {id} 超出范围 [1, {batch_size}]")]
    OutOfRange { id: usize, batch_size: usize },
    #[error("样本 {id} 的结果已经存在，拒绝覆盖")]
    Duplicate { id: usize },
}

/// 结果收集器
#[derive(Debug)]
pub struct ResultCollector {
    slots: Vec<Option<SampleOutcome>>,
    received: usize,
}

impl ResultCollector {
    pub fn new(batch_size: usize) -> Self {
        Self {
            slots: vec![None; batch_size],
            received: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.slots.len()
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    /// 把样本 `k` 的结果写进第 `k - 1` 个槽位
    pub fn place(&mut self, outcome: SampleOutcome) -> Result<(), PlacementError> {
        let batch_size = self.slots.len();
        let slot = outcome
            .id
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(PlacementError::OutOfRange {
                id: outcome.id,
                batch_size,
            })?;

        if slot.is_some() {
            return Err(PlacementError::Duplicate { id: outcome.id });
        }

        debug!("收到样本 {} 的结果 ({}/{})", outcome.id, self.received + 1, batch_size);
        *slot = Some(outcome);
        self.received += 1;
        Ok(())
    }

    /// 从通道接收结果，直到收满 `batch_size` 个
    ///
    /// 所有发送端都已退出而仍未收满时，剩余槽位补为失败结果。
    pub async fn collect(mut self, intake: &mut mpsc::Receiver<SampleOutcome>) -> BatchResult {
        while !self.is_complete() {
            match intake.recv().await {
                Some(outcome) => {
                    if let Err(e) = self.place(outcome) {
                        warn!("丢弃结果: {}", e);
                    }
                }
                None => {
                    warn!(
                        "所有样本任务都已退出，但只收到 {}/{} 个结果",
                        self.received,
                        self.slots.len()
                    );
                    break;
                }
            }
        }

        self.finish()
    }

    /// 生成最终批次，空槽位补为失败结果
    pub fn finish(self) -> BatchResult {
        let entries = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| SampleOutcome::failure(index + 1, MISSING_OUTCOME_REASON))
            })
            .collect();
        BatchResult::from_ordered(entries)
    }
}
