use thiserror::Error;

/// Errors raised while assembling a [`Dispatcher`](crate::Dispatcher).
///
/// These are always returned synchronously from
/// [`DispatcherBuilder::build`](crate::DispatcherBuilder::build) or from
/// config parsing, never from a running dispatcher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No bot lists were registered.
    #[error("at least one bot list must be registered")]
    NoBotLists,

    /// No stats provider was supplied.
    #[error("a stats provider is required")]
    MissingProvider,

    /// Interval must be `-1` (disabled) or a positive number of milliseconds.
    #[error("invalid interval {0}ms: must be -1 or greater than 0")]
    InvalidInterval(i64),

    /// Initial delay must not be negative.
    #[error("invalid initial delay {0}ms: must not be negative")]
    InvalidInitialDelay(i64),

    /// No transport was supplied and the `http` feature is disabled.
    #[error("no transport configured")]
    MissingTransport,

    /// No scheduler handle was supplied and no tokio runtime is active.
    #[error("no tokio runtime available to drive the dispatcher")]
    NoRuntime,

    /// Config document could not be parsed.
    #[error("invalid config document: {0}")]
    Parse(String),
}

/// Errors reported by a [`StatsProvider`](crate::StatsProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The metrics source could not produce a value.
    #[error("stats unavailable: {0}")]
    Unavailable(String),

    /// Shard ids and per-shard guild counts do not line up.
    #[error("shard data mismatch: {ids} shard ids but {counts} guild counts")]
    ShardMismatch {
        ids: usize,
        counts: usize,
    },
}

/// Why a single destination could not be delivered to in a round.
///
/// Delivery errors are isolated per destination and only ever reach the
/// failure handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Shard mode is on but the snapshot carries no shard data.
    #[error("{destination} requires shard data but the snapshot has none")]
    MissingShardData {
        destination: String,
    },

    /// Request body could not be serialized.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),

    /// Request signature could not be computed.
    #[error("failed to sign request: {0}")]
    Signing(String),

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Transport gave up waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// Remote answered with a non-2xx status.
    #[error("remote returned HTTP {status}")]
    Status {
        status: u16,
        body: String,
    },
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        DeliveryError::Serialization(err.to_string())
    }
}

/// Errors returned by [`Dispatcher::post`](crate::Dispatcher::post).
///
/// Per-destination failures are not represented here; a round that reaches
/// the fan-out stage always resolves successfully.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The snapshot could not be computed, so nothing was sent.
    #[error("could not compute stats snapshot: {0}")]
    Provider(#[from] ProviderError),
}
