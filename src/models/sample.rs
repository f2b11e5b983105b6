//! 样本数据模型
//!
//! 一次批量运行里：每个 `SampleRequest` 对应恰好一个 `SampleOutcome`，
//! 所有结果按样本 ID 排成 `BatchResult`。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::image::SampleImage;

/// 单个样本请求
///
/// 只在派发时创建，参数化一次调用后即丢弃。
#[derive(Debug, Clone)]
pub struct SampleRequest {
    /// 样本 ID（从 1 开始，批内唯一）
    pub id: usize,
    /// 整批共享的图片
    pub image: SampleImage,
}

impl SampleRequest {
    pub fn new(id: usize, image: SampleImage) -> Self {
        Self { id, image }
    }
}

/// 单个样本的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleResult {
    /// 模型返回的文本
    Success(String),
    /// 失败原因
    Failure(String),
}

impl SampleResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SampleResult::Success(_))
    }

    /// 渲染给下游的响应文本，失败时带 `Error: ` 前缀
    pub fn response_text(&self) -> String {
        match self {
            SampleResult::Success(text) => text.clone(),
            SampleResult::Failure(reason) => format!("Error: {}", reason),
        }
    }
}

/// 带样本 ID 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOutcome {
    pub id: usize,
    pub result: SampleResult,
}

impl SampleOutcome {
    pub fn success(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            result: SampleResult::Success(text.into()),
        }
    }

    pub fn failure(id: usize, reason: impl Into<String>) -> Self {
        Self {
            id,
            result: SampleResult::Failure(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

impl fmt::Display for SampleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[样本 {}] {}", self.id, self.result.response_text())
    }
}

/// 最终输出的单条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample_id: usize,
    pub response: String,
}

impl From<&SampleOutcome> for SampleRecord {
    fn from(outcome: &SampleOutcome) -> Self {
        Self {
            sample_id: outcome.id,
            response: outcome.result.response_text(),
        }
    }
}

/// 一整批的有序结果
///
/// 第 `i` 个位置是样本 `i + 1` 的结果。只能由 `ResultCollector` 构造。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    entries: Vec<SampleOutcome>,
}

impl BatchResult {
    pub(crate) fn from_ordered(entries: Vec<SampleOutcome>) -> Self {
        debug_assert!(entries.iter().enumerate().all(|(i, o)| o.id == i + 1));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SampleOutcome] {
        &self.entries
    }

    /// 按样本 ID 取结果
    pub fn get(&self, id: usize) -> Option<&SampleOutcome> {
        id.checked_sub(1).and_then(|index| self.entries.get(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleOutcome> {
        self.entries.iter()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// 失败占比，空批次为 0
    pub fn failure_rate(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.failure_count() as f64 / self.len() as f64
    }

    pub fn to_records(&self) -> Vec<SampleRecord> {
        self.entries.iter().map(SampleRecord::from).collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_records())
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a SampleOutcome;
    type IntoIter = std::slice::Iter<'a, SampleOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
