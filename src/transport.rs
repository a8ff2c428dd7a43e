use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::types::{OutboundRequest, TransportResponse};

/// Sends outbound requests.
///
/// A single transport is shared by every destination of every round, so
/// implementations must be safe for concurrent use. Timeout policy belongs
/// here; the dispatcher imposes none.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `request` and return the raw response.
    ///
    /// Any HTTP status is a successful send; the dispatcher classifies
    /// non-2xx statuses itself.
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, DeliveryError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, user agent).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, DeliveryError> {
        let mut builder = self.client.post(&request.url).body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                DeliveryError::Timeout
            } else {
                DeliveryError::Network(err.to_string())
            }
        })?;

        let url = response.url().to_string();
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        let body = match response.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "failed to read response body");
                String::new()
            }
        };

        Ok(TransportResponse {
            url,
            status,
            headers,
            body,
        })
    }
}
