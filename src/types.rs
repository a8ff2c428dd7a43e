use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// Point-in-time bot statistics computed once per delivery round.
///
/// Snapshots are immutable. When `shard_ids` is present,
/// `shard_guild_counts` is present too and has the same length; the two are
/// aligned by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Total number of guilds the bot is in.
    pub guild_count: u64,

    /// Shard ids running in this process, when sharded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_ids: Option<Vec<u32>>,

    /// Guild count per shard, aligned with `shard_ids`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_guild_counts: Option<Vec<u64>>,
}

impl Snapshot {
    /// Snapshot of an unsharded bot.
    pub fn new(guild_count: u64) -> Self {
        Self {
            guild_count,
            shard_ids: None,
            shard_guild_counts: None,
        }
    }

    /// Attach per-shard data.
    pub fn with_shards(mut self, shard_ids: Vec<u32>, shard_guild_counts: Vec<u64>) -> Self {
        self.shard_ids = Some(shard_ids);
        self.shard_guild_counts = Some(shard_guild_counts);
        self
    }

    /// Whether the snapshot carries per-shard guild counts.
    pub fn has_shard_data(&self) -> bool {
        self.shard_guild_counts.is_some()
    }
}

/// Read-only view of the dispatcher handed to destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchContext {
    /// Whether destinations should send per-shard data.
    pub shard_mode: bool,

    /// Id of the bot being reported.
    pub bot_id: u64,
}

/// Description of one outbound POST request.
///
/// Produced by a [`Destination`](crate::Destination), consumed by a
/// [`Transport`](crate::Transport). The method is always POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Fully formatted target URL.
    pub url: String,

    /// Request headers.
    pub headers: BTreeMap<String, String>,

    /// Serialized request body.
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /// Create a request with an empty body and no headers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a request carrying `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(url: impl Into<String>, value: &T) -> Result<Self, DeliveryError> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(url)
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// URL the request was sent to.
    pub url: String,

    /// HTTP status code.
    pub status: u16,

    /// Response headers.
    pub headers: BTreeMap<String, String>,

    /// Response body, lossily decoded.
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Tally of one completed delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostSummary {
    /// Destinations whose success handler ran.
    pub delivered: usize,

    /// Destinations whose failure handler ran (or whose task panicked).
    pub failed: usize,
}

impl PostSummary {
    /// Total destinations attempted.
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}
