#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use guild_stats_dispatcher::{
    DeliveryError, DispatcherBuilder, OutboundRequest, Transport, TransportResponse,
};

/// Records every request. URLs containing `fail` get a network error,
/// URLs containing `status500` get an HTTP 500.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, DeliveryError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if request.url.contains("fail") {
            return Err(DeliveryError::Network("connection refused".to_string()));
        }

        let status = if request.url.contains("status500") { 500 } else { 200 };
        Ok(TransportResponse {
            url: request.url.clone(),
            status,
            headers: BTreeMap::new(),
            body: "{}".to_string(),
        })
    }
}

/// Collects handler invocations.
#[derive(Clone, Default)]
pub struct HandlerLog {
    successes: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<(String, DeliveryError)>>>,
}

impl HandlerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install both handlers on `builder`.
    pub fn attach(&self, builder: DispatcherBuilder) -> DispatcherBuilder {
        let successes = Arc::clone(&self.successes);
        let failures = Arc::clone(&self.failures);
        builder
            .success_handler(move |success| {
                successes.lock().unwrap().push(success.destination.clone());
            })
            .error_handler(move |failure| {
                failures
                    .lock()
                    .unwrap()
                    .push((failure.destination.clone(), failure.error.clone()));
            })
    }

    pub fn successes(&self) -> Vec<String> {
        let mut names = self.successes.lock().unwrap().clone();
        names.sort();
        names
    }

    pub fn failures(&self) -> Vec<(String, DeliveryError)> {
        let mut failures = self.failures.lock().unwrap().clone();
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        failures
    }

    pub fn total(&self) -> usize {
        self.successes.lock().unwrap().len() + self.failures.lock().unwrap().len()
    }
}
