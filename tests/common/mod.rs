//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use freight_ai::config::BatchConfig;
use freight_ai::engine::BatchService;
use freight_ai::error::{Error, Result};
use freight_ai::llm::{Upstream, UpstreamRequest, UpstreamResponse};
use freight_ai::negotiation::{HandoffPackage, Notifier};

/// Answers every item with `"<kind> #<n>"` and fixed aggregate usage.
pub struct EchoUpstream {
    pub tokens: u64,
    pub cost: f64,
    pub calls: Mutex<Vec<UpstreamRequest>>,
}

impl EchoUpstream {
    pub fn new(tokens: u64, cost: f64) -> Arc<Self> {
        Arc::new(Self {
            tokens,
            cost,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for EchoUpstream {
    async fn dispatch(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let results = (0..request.task_count)
            .map(|i| serde_json::Value::String(format!("{} #{}", request.kind, i + 1)))
            .collect();
        self.calls.lock().unwrap().push(request);
        Ok(UpstreamResponse {
            results,
            tokens_used: self.tokens,
            cost: self.cost,
        })
    }
}

/// Returns the same JSON value for every item.
pub struct FixedUpstream {
    pub value: serde_json::Value,
    pub calls: Mutex<usize>,
}

impl FixedUpstream {
    pub fn new(value: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            value,
            calls: Mutex::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Upstream for FixedUpstream {
    async fn dispatch(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        *self.calls.lock().unwrap() += 1;
        Ok(UpstreamResponse {
            results: vec![self.value.clone(); request.task_count],
            tokens_used: 40,
            cost: 0.02,
        })
    }
}

pub struct FailingUpstream;

#[async_trait]
impl Upstream for FailingUpstream {
    async fn dispatch(&self, _request: UpstreamRequest) -> Result<UpstreamResponse> {
        Err(Error::UpstreamDispatchFailed("connection reset".to_string()))
    }
}

/// Never answers within any sane timeout.
pub struct StuckUpstream;

#[async_trait]
impl Upstream for StuckUpstream {
    async fn dispatch(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(UpstreamResponse {
            results: vec![serde_json::Value::Null; request.task_count],
            tokens_used: 0,
            cost: 0.0,
        })
    }
}

/// Drops the last result of every batch.
pub struct ShortUpstream;

#[async_trait]
impl Upstream for ShortUpstream {
    async fn dispatch(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        Ok(UpstreamResponse {
            results: vec![serde_json::json!("ok"); request.task_count.saturating_sub(1)],
            tokens_used: 10,
            cost: 0.01,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub packages: Mutex<Vec<HandoffPackage>>,
}

impl RecordingNotifier {
    pub fn packages(&self) -> Vec<HandoffPackage> {
        self.packages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, package: &HandoffPackage) -> Result<()> {
        self.packages.lock().unwrap().push(package.clone());
        Ok(())
    }
}

/// Fast-polling config for tests.
pub fn test_config() -> BatchConfig {
    BatchConfig {
        batch_interval_secs: 1,
        poll_interval_ms: 10,
        poll_timeout_secs: 5,
        dispatch_timeout_secs: 2,
        ..BatchConfig::default()
    }
}

pub fn service(config: BatchConfig, upstream: Arc<dyn Upstream>) -> Arc<BatchService> {
    Arc::new(BatchService::new(config, upstream))
}
