use std::fmt;

use crate::error::DeliveryError;
use crate::types::{DispatchContext, OutboundRequest, Snapshot};

/// Default header used for token authentication.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Placeholder replaced by the bot id in URL templates.
pub const BOT_ID_PLACEHOLDER: &str = "{id}";

/// A reporting target that turns a snapshot into one outbound request.
///
/// Destinations are stateless with respect to the dispatcher: they read the
/// snapshot and the [`DispatchContext`] and describe a request. The same
/// snapshot is handed to every destination of a round concurrently.
pub trait Destination: Send + Sync {
    /// Short name used in logs and handler reports.
    fn name(&self) -> &str;

    /// Describe the POST request for this round.
    ///
    /// # Errors
    /// Returns [`DeliveryError::MissingShardData`] when shard mode is on and
    /// the destination needs per-shard counts the snapshot does not carry.
    fn build_request(
        &self,
        snapshot: &Snapshot,
        ctx: &DispatchContext,
    ) -> Result<OutboundRequest, DeliveryError>;
}

impl fmt::Debug for dyn Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Destination").field(&self.name()).finish()
    }
}

/// Join `base` and `endpoint` and substitute every `{id}` with `bot_id`.
///
/// ```
/// use guild_stats_dispatcher::format_url;
///
/// let url = format_url("https://example.test/api", "/bots/{id}/stats", 123);
/// assert_eq!(url, "https://example.test/api/bots/123/stats");
/// ```
pub fn format_url(base: &str, endpoint: &str, bot_id: u64) -> String {
    let mut url = String::with_capacity(base.len() + endpoint.len() + 20);
    url.push_str(base.trim_end_matches('/'));
    if !endpoint.is_empty() && !endpoint.starts_with('/') {
        url.push('/');
    }
    url.push_str(endpoint);
    url.replace(BOT_ID_PLACEHOLDER, &bot_id.to_string())
}

/// Token credentials plus the header they travel in.
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
    header: String,
}

impl TokenAuth {
    /// Send `token` in the `Authorization` header.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            header: AUTHORIZATION_HEADER.to_string(),
        }
    }

    /// Use a different header name.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Header name the token is sent in.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Attach the credentials to `request`.
    pub fn apply(&self, request: OutboundRequest) -> OutboundRequest {
        request.with_header(self.header.clone(), self.token.clone())
    }
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth")
            .field("header", &self.header)
            .field("token", &"<redacted>")
            .finish()
    }
}
