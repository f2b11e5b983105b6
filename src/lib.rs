//! # Inquisitor
//!
//! 把同一张试卷图片重复发送给视觉模型 N 次，按样本编号收集回答，
//! 用来观察非确定性模型的回答差异。
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - 样本请求、样本结果、有序批次、共享图片
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个样本
//! - `VisionService` - 调用视觉模型，失败收敛为 `Failure`
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - 为每个样本启动任务，控制并发与超时
//! - `orchestrator/collector` - 按样本编号落位，收满即结束
//! - `orchestrator/batch_orchestrator` - 组装以上两者，对外唯一入口
//!
//! ### ④ 应用外壳（App）
//! - `app` / `config` / `utils::logging` - 读取配置和图片、输出结果
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{BatchResult, SampleImage, SampleOutcome, SampleRequest, SampleResult};
pub use orchestrator::{BatchOrchestrator, DispatchOptions};
pub use services::{VisionInference, VisionService};
