#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use inquisitor::{SampleImage, SampleOutcome, SampleRequest, VisionInference};

pub fn test_image() -> SampleImage {
    SampleImage::from(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}

/// 按脚本返回结果的推理实现
///
/// - 成功时返回 `ok-{id}`
/// - `failures` 中的样本返回对应的失败原因
/// - `delays` 控制每个样本的完成时间，用来打乱到达顺序
/// - `panics` 中的样本直接 panic
#[derive(Default)]
pub struct ScriptedAdapter {
    pub delays: HashMap<usize, Duration>,
    pub failures: HashMap<usize, String>,
    pub panics: Vec<usize>,
    pub hangs: Vec<usize>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completion_order: Mutex<Vec<usize>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delays(mut self, delays_ms: &[(usize, u64)]) -> Self {
        self.delays = delays_ms
            .iter()
            .map(|&(id, ms)| (id, Duration::from_millis(ms)))
            .collect();
        self
    }

    pub fn failing(mut self, id: usize, reason: &str) -> Self {
        self.failures.insert(id, reason.to_string());
        self
    }

    pub fn panicking(mut self, id: usize) -> Self {
        self.panics.push(id);
        self
    }

    pub fn hanging(mut self, id: usize) -> Self {
        self.hangs.push(id);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn completion_order(&self) -> Vec<usize> {
        self.completion_order.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionInference for ScriptedAdapter {
    async fn invoke(&self, request: SampleRequest) -> SampleOutcome {
        let id = request.id;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.hangs.contains(&id) {
            futures::future::pending::<()>().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completion_order.lock().unwrap().push(id);

        if self.panics.contains(&id) {
            panic!("scripted panic for sample {}", id);
        }

        match self.failures.get(&id) {
            Some(reason) => SampleOutcome::failure(id, reason.clone()),
            None => SampleOutcome::success(id, format!("ok-{}", id)),
        }
    }
}
