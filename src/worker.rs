use std::fmt;
use std::sync::Arc;

use crate::destination::Destination;
use crate::error::DeliveryError;
use crate::transport::Transport;
use crate::types::{DispatchContext, Snapshot, TransportResponse};

#[cfg(feature = "metrics")]
fn metric_inc_destination(name: &'static str, destination: &str) {
    metrics::increment_counter!(name, "destination" => destination.to_string());
}

#[cfg(not(feature = "metrics"))]
fn metric_inc_destination(_name: &'static str, _destination: &str) {}

/// Passed to the success handler once per delivered destination.
#[derive(Debug, Clone)]
pub struct DeliverySuccess {
    /// Name of the destination.
    pub destination: String,

    /// Raw response from the transport.
    pub response: TransportResponse,
}

/// Passed to the failure handler once per failed destination.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    /// Name of the destination.
    pub destination: String,

    /// What went wrong.
    pub error: DeliveryError,
}

/// Callback invoked for each successful delivery.
pub type SuccessHandler = Arc<dyn Fn(&DeliverySuccess) + Send + Sync>;

/// Callback invoked for each failed delivery.
pub type FailureHandler = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

pub(crate) fn default_success_handler() -> SuccessHandler {
    Arc::new(|success: &DeliverySuccess| {
        tracing::debug!(
            destination = %success.destination,
            url = %success.response.url,
            status = success.response.status,
            "posted stats"
        );
    })
}

pub(crate) fn default_failure_handler() -> FailureHandler {
    Arc::new(|failure: &DeliveryFailure| {
        tracing::error!(
            destination = %failure.destination,
            error = %failure.error,
            "could not post stats"
        );
    })
}

pub(crate) fn silent_success_handler() -> SuccessHandler {
    Arc::new(|_: &DeliverySuccess| {})
}

pub(crate) fn silent_failure_handler() -> FailureHandler {
    Arc::new(|_: &DeliveryFailure| {})
}

/// Result of one destination's delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryOutcome {
    Delivered,
    Failed,
}

/// Transport and handlers shared by every delivery task.
pub(crate) struct DeliveryContext {
    pub transport: Arc<dyn Transport>,
    pub on_success: SuccessHandler,
    pub on_failure: FailureHandler,
}

impl fmt::Debug for DeliveryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryContext").finish_non_exhaustive()
    }
}

/// Deliver one snapshot to one destination and report through exactly one
/// handler.
pub(crate) async fn deliver(
    destination: Arc<dyn Destination>,
    snapshot: Arc<Snapshot>,
    ctx: DispatchContext,
    shared: Arc<DeliveryContext>,
) -> DeliveryOutcome {
    let name = destination.name().to_string();

    match attempt(destination.as_ref(), &snapshot, &ctx, shared.transport.as_ref()).await {
        Ok(response) => {
            metric_inc_destination("stats.delivery.success", &name);
            (shared.on_success)(&DeliverySuccess {
                destination: name,
                response,
            });
            DeliveryOutcome::Delivered
        }
        Err(error) => {
            metric_inc_destination("stats.delivery.failure", &name);
            (shared.on_failure)(&DeliveryFailure {
                destination: name,
                error,
            });
            DeliveryOutcome::Failed
        }
    }
}

async fn attempt(
    destination: &dyn Destination,
    snapshot: &Snapshot,
    ctx: &DispatchContext,
    transport: &dyn Transport,
) -> Result<TransportResponse, DeliveryError> {
    let request = destination.build_request(snapshot, ctx)?;
    tracing::trace!(destination = destination.name(), url = %request.url, "sending stats");

    let response = transport.send(&request).await?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(DeliveryError::Status {
            status: response.status,
            body: response.body,
        })
    }
}
