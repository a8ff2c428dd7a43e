//! Scheduled delivery of chat-bot statistics to bot-list websites.
//!
//! A [`Dispatcher`] periodically asks a [`StatsProvider`] for the bot's
//! guild counts, turns the result into one [`Snapshot`], and posts it to
//! every registered [`Destination`] concurrently.
//!
//! ## Guarantees
//! - One snapshot per round, shared by every destination
//! - Per-destination isolation: one list failing never delays another
//! - Exactly one success or failure handler call per destination per round
//! - Fixed-rate scheduling; slow rounds may overlap, never block the timer
//!
//! ## Non-Guarantees
//! - Retries (failures are reported, not retried)
//! - History (only the last snapshot and post time are kept)
//! - Ordering of completions within a round
//!
//! ## Features
//! - `http` (default): [`ReqwestTransport`], used when no transport is set
//! - `metrics`: round and delivery counters via the `metrics` crate

mod config;
mod destination;
mod dispatcher;
mod error;
mod lists;
mod provider;
mod signing;
mod transport;
mod types;
mod worker;

pub use config::{DispatcherBuilder, DispatcherConfig, DEFAULT_INTERVAL_MS, LOOP_DISABLED};
pub use destination::{format_url, Destination, TokenAuth, AUTHORIZATION_HEADER, BOT_ID_PLACEHOLDER};
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, DeliveryError, DispatchError, ProviderError};
pub use lists::{
    BotlistSpace,
    BotsForDiscord,
    DiscordBotsOrg,
    WebhookDestination,
    SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
pub use provider::{GenericProvider, SnapshotBuilder, StatsProvider};
pub use signing::{compute_signature, verify_signature};
pub use transport::Transport;
pub use types::{DispatchContext, OutboundRequest, PostSummary, Snapshot, TransportResponse};
pub use worker::{DeliveryFailure, DeliverySuccess, FailureHandler, SuccessHandler};

#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
