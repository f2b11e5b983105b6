//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `dispatcher` - 样本调度器
//! - 为每个样本 ID 启动一个任务
//! - 控制并发数量（Semaphore）与单样本超时
//!
//! ### `collector` - 结果收集器
//! - 按到达顺序接收，按样本 ID 落位
//! - 收满 N 个才结束
//!
//! ### `batch_orchestrator` - 批量编排器
//! - 组装调度器和收集器，返回有序批次
//!
//! ## 层次关系
//!
//! ```text
//! batch_orchestrator (处理一整批)
//!     ↓
//! dispatcher ──mpsc──→ collector
//!     ↓
//! services::VisionInference (处理单个样本)
//! ```

pub mod batch_orchestrator;
pub mod collector;
pub mod dispatcher;

// 重新导出主要类型
pub use batch_orchestrator::BatchOrchestrator;
pub use collector::{PlacementError, ResultCollector, MISSING_OUTCOME_REASON};
pub use dispatcher::{DispatchHandle, DispatchOptions, SampleDispatcher};
