//! Built-in bot-list destinations.
//!
//! Each list is a plain configuration object: an API base URL, an endpoint
//! template containing `{id}`, credentials, and the body schema the site
//! expects. Base URLs can be overridden to target mirrors or test servers.

use serde::Serialize;

use crate::destination::{format_url, Destination, TokenAuth, BOT_ID_PLACEHOLDER};
use crate::error::DeliveryError;
use crate::signing::build_signature_headers;
use crate::types::{DispatchContext, OutboundRequest, Snapshot};

#[derive(Serialize)]
struct ServerCountBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    server_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shards: Option<&'a [u64]>,
}

fn shard_counts<'a>(snapshot: &'a Snapshot, destination: &str) -> Result<&'a [u64], DeliveryError> {
    snapshot
        .shard_guild_counts
        .as_deref()
        .ok_or_else(|| DeliveryError::MissingShardData {
            destination: destination.to_string(),
        })
}

fn token_request(
    base_url: &str,
    endpoint: &str,
    ctx: &DispatchContext,
    auth: &TokenAuth,
    body: &ServerCountBody<'_>,
) -> Result<OutboundRequest, DeliveryError> {
    let request = OutboundRequest::json(format_url(base_url, endpoint, ctx.bot_id), body)?;
    Ok(auth.apply(request))
}

/// [discordbots.org](https://discordbots.org/api/docs#bots) (top.gg).
///
/// Sends `server_count`, plus `shards` in shard mode.
#[derive(Debug, Clone)]
pub struct DiscordBotsOrg {
    auth: TokenAuth,
    base_url: String,
}

impl DiscordBotsOrg {
    pub const API_URL: &'static str = "https://discordbots.org/api";
    pub const ENDPOINT: &'static str = "/bots/{id}/stats";

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            auth: TokenAuth::new(token),
            base_url: Self::API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Destination for DiscordBotsOrg {
    fn name(&self) -> &str {
        "discordbots.org"
    }

    fn build_request(
        &self,
        snapshot: &Snapshot,
        ctx: &DispatchContext,
    ) -> Result<OutboundRequest, DeliveryError> {
        let shards = if ctx.shard_mode {
            Some(shard_counts(snapshot, self.name())?)
        } else {
            None
        };
        let body = ServerCountBody {
            server_count: Some(snapshot.guild_count),
            shards,
        };
        token_request(&self.base_url, Self::ENDPOINT, ctx, &self.auth, &body)
    }
}

/// [botlist.space](https://docs.botlist.space/bl-docs/bots#server-count).
///
/// Sends either `shards` (shard mode) or `server_count`, never both.
#[derive(Debug, Clone)]
pub struct BotlistSpace {
    auth: TokenAuth,
    base_url: String,
}

impl BotlistSpace {
    pub const API_URL: &'static str = "https://api.botlist.space/v1";
    pub const ENDPOINT: &'static str = "/bots/{id}";

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            auth: TokenAuth::new(token),
            base_url: Self::API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Destination for BotlistSpace {
    fn name(&self) -> &str {
        "botlist.space"
    }

    fn build_request(
        &self,
        snapshot: &Snapshot,
        ctx: &DispatchContext,
    ) -> Result<OutboundRequest, DeliveryError> {
        let body = if ctx.shard_mode {
            ServerCountBody {
                server_count: None,
                shards: Some(shard_counts(snapshot, self.name())?),
            }
        } else {
            ServerCountBody {
                server_count: Some(snapshot.guild_count),
                shards: None,
            }
        };
        token_request(&self.base_url, Self::ENDPOINT, ctx, &self.auth, &body)
    }
}

/// [botsfordiscord.com](https://docs.botsfordiscord.com/methods/bots#bot-stats).
///
/// Has no shard endpoint; always sends `server_count`.
#[derive(Debug, Clone)]
pub struct BotsForDiscord {
    auth: TokenAuth,
    base_url: String,
}

impl BotsForDiscord {
    pub const API_URL: &'static str = "https://botsfordiscord.com/api";
    pub const ENDPOINT: &'static str = "/bot/{id}";

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            auth: TokenAuth::new(token),
            base_url: Self::API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Destination for BotsForDiscord {
    fn name(&self) -> &str {
        "botsfordiscord.com"
    }

    fn build_request(
        &self,
        snapshot: &Snapshot,
        ctx: &DispatchContext,
    ) -> Result<OutboundRequest, DeliveryError> {
        if ctx.shard_mode {
            tracing::warn!(destination = self.name(), "shard stats not supported, sending total only");
        }
        let body = ServerCountBody {
            server_count: Some(snapshot.guild_count),
            shards: None,
        };
        token_request(&self.base_url, Self::ENDPOINT, ctx, &self.auth, &body)
    }
}

/// Default signature header for [`WebhookDestination`].
pub const SIGNATURE_HEADER: &str = "X-Stats-Signature";

/// Default timestamp header for [`WebhookDestination`].
pub const TIMESTAMP_HEADER: &str = "X-Stats-Timestamp";

#[derive(Serialize)]
struct WebhookBody<'a> {
    bot_id: u64,
    guild_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    shard_ids: Option<&'a [u32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shard_guild_counts: Option<&'a [u64]>,
}

/// Self-hosted receiver at an arbitrary URL template.
///
/// The body carries the bot id and the whole snapshot (shard fields only in
/// shard mode). With a secret set, the body is HMAC-signed and the receiver
/// can check it with [`verify_signature`](crate::verify_signature).
#[derive(Clone)]
pub struct WebhookDestination {
    name: String,
    url_template: String,
    auth: Option<TokenAuth>,
    secret: Option<Vec<u8>>,
    include_timestamp: bool,
    signature_header: String,
    timestamp_header: String,
}

impl WebhookDestination {
    /// Post to `url_template`, in which `{id}` is replaced by the bot id.
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            auth: None,
            secret: None,
            include_timestamp: true,
            signature_header: SIGNATURE_HEADER.to_string(),
            timestamp_header: TIMESTAMP_HEADER.to_string(),
        }
    }

    /// Send a token with every request.
    pub fn with_auth(mut self, auth: TokenAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sign request bodies with `secret`.
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Enable or disable binding the unix timestamp into the signature.
    pub fn with_timestamped_signatures(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    pub fn with_timestamp_header(mut self, header: impl Into<String>) -> Self {
        self.timestamp_header = header.into();
        self
    }
}

impl std::fmt::Debug for WebhookDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDestination")
            .field("name", &self.name)
            .field("url_template", &self.url_template)
            .field("signed", &self.secret.is_some())
            .finish_non_exhaustive()
    }
}

impl Destination for WebhookDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_request(
        &self,
        snapshot: &Snapshot,
        ctx: &DispatchContext,
    ) -> Result<OutboundRequest, DeliveryError> {
        let (shard_ids, shard_guild_counts) = if ctx.shard_mode && snapshot.has_shard_data() {
            (snapshot.shard_ids.as_deref(), snapshot.shard_guild_counts.as_deref())
        } else {
            (None, None)
        };
        let body = WebhookBody {
            bot_id: ctx.bot_id,
            guild_count: snapshot.guild_count,
            shard_ids,
            shard_guild_counts,
        };

        // Used verbatim apart from the id; receivers may route on a trailing slash.
        let url = self
            .url_template
            .replace(BOT_ID_PLACEHOLDER, &ctx.bot_id.to_string());
        let mut request = OutboundRequest::json(url, &body)?;

        if let Some(secret) = &self.secret {
            let timestamp_header = self.include_timestamp.then_some(self.timestamp_header.as_str());
            let headers = build_signature_headers(
                secret,
                &request.body,
                &self.signature_header,
                timestamp_header,
            )?;
            let (name, value) = headers.signature;
            request = request.with_header(name, value);
            if let Some((name, value)) = headers.timestamp {
                request = request.with_header(name, value);
            }
        }

        Ok(match &self.auth {
            Some(auth) => auth.apply(request),
            None => request,
        })
    }
}
