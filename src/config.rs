use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::destination::Destination;
use crate::dispatcher::Dispatcher;
use crate::error::ConfigError;
use crate::provider::StatsProvider;
use crate::transport::Transport;
use crate::worker::{
    default_failure_handler, default_success_handler, silent_failure_handler,
    silent_success_handler, DeliveryFailure, DeliverySuccess, FailureHandler, SuccessHandler,
};

/// Interval value that disables the posting loop.
pub const LOOP_DISABLED: i64 = -1;

/// Default posting interval (10 minutes).
pub const DEFAULT_INTERVAL_MS: i64 = 10 * 60 * 1_000;

/// Timing and mode settings for a [`Dispatcher`].
///
/// Every field has a default, so a config document only needs the keys it
/// overrides:
///
/// ```
/// use guild_stats_dispatcher::DispatcherConfig;
///
/// let config = DispatcherConfig::from_json(r#"{ "interval_ms": 60000, "shard_mode": true }"#)?;
/// assert_eq!(config.initial_delay(), std::time::Duration::from_secs(60));
/// # Ok::<(), guild_stats_dispatcher::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Milliseconds between rounds, or [`LOOP_DISABLED`].
    pub interval_ms: i64,

    /// Milliseconds before the first round. Defaults to the interval.
    pub initial_delay_ms: Option<i64>,

    /// Ask destinations to send per-shard data.
    pub shard_mode: bool,

    /// Start the loop as soon as the dispatcher is built.
    pub auto_start: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            initial_delay_ms: None,
            shard_mode: false,
            auto_start: true,
        }
    }
}

impl DispatcherConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check interval and initial delay.
    ///
    /// # Errors
    /// [`ConfigError::InvalidInterval`] unless the interval is `-1` or
    /// positive; [`ConfigError::InvalidInitialDelay`] for a negative delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms != LOOP_DISABLED && self.interval_ms <= 0 {
            return Err(ConfigError::InvalidInterval(self.interval_ms));
        }
        if let Some(delay) = self.initial_delay_ms {
            if delay < 0 {
                return Err(ConfigError::InvalidInitialDelay(delay));
            }
        }
        Ok(())
    }

    /// Loop period, or `None` when the loop is disabled.
    pub fn interval(&self) -> Option<Duration> {
        u64::try_from(self.interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Delay before the first scheduled round.
    pub fn initial_delay(&self) -> Duration {
        let ms = self.initial_delay_ms.unwrap_or(self.interval_ms);
        Duration::from_millis(u64::try_from(ms).unwrap_or(0))
    }

    /// Whether the posting loop can run at all.
    pub fn loop_enabled(&self) -> bool {
        self.interval_ms != LOOP_DISABLED
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Assembles and validates a [`Dispatcher`].
///
/// ```no_run
/// use std::time::Duration;
/// use guild_stats_dispatcher::{DiscordBotsOrg, DispatcherBuilder, GenericProvider};
///
/// # async fn run() -> Result<(), guild_stats_dispatcher::ConfigError> {
/// let dispatcher = DispatcherBuilder::new()
///     .provider(GenericProvider::new(123, || 42))
///     .bot_list(DiscordBotsOrg::new("token"))
///     .interval(Duration::from_secs(30 * 60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    scheduler: Option<Handle>,
    bot_lists: Vec<Arc<dyn Destination>>,
    provider: Option<Arc<dyn StatsProvider>>,
    on_failure: FailureHandler,
    on_success: SuccessHandler,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            config: DispatcherConfig::default(),
            scheduler: None,
            bot_lists: Vec::new(),
            provider: None,
            on_failure: default_failure_handler(),
            on_success: default_success_handler(),
            transport: None,
        }
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a provider plus its bot lists.
    pub fn with_provider<P, I>(provider: P, bot_lists: I) -> Self
    where
        P: StatsProvider + 'static,
        I: IntoIterator<Item = Arc<dyn Destination>>,
    {
        Self::new().provider(provider).bot_lists(bot_lists)
    }

    /// Replace all timing and mode settings.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime the loop and delivery tasks are spawned on.
    ///
    /// Defaults to the runtime active when [`build`](Self::build) is called.
    pub fn scheduler(mut self, handle: Handle) -> Self {
        self.scheduler = Some(handle);
        self
    }

    pub fn interval(self, interval: Duration) -> Self {
        self.interval_millis(duration_ms(interval))
    }

    /// Interval in milliseconds; `-1` disables the loop.
    pub fn interval_millis(mut self, interval_ms: i64) -> Self {
        self.config.interval_ms = interval_ms;
        self
    }

    pub fn initial_delay(self, delay: Duration) -> Self {
        self.initial_delay_millis(duration_ms(delay))
    }

    pub fn initial_delay_millis(mut self, delay_ms: i64) -> Self {
        self.config.initial_delay_ms = Some(delay_ms);
        self
    }

    /// Register one bot list. Lists are dispatched in registration order.
    pub fn bot_list<D: Destination + 'static>(mut self, destination: D) -> Self {
        self.bot_lists.push(Arc::new(destination));
        self
    }

    pub fn bot_lists<I>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Destination>>,
    {
        self.bot_lists.extend(destinations);
        self
    }

    pub fn shard_mode(mut self, enabled: bool) -> Self {
        self.config.shard_mode = enabled;
        self
    }

    pub fn provider<P: StatsProvider + 'static>(self, provider: P) -> Self {
        self.shared_provider(Arc::new(provider))
    }

    pub fn shared_provider(mut self, provider: Arc<dyn StatsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Called once per failed destination per round.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DeliveryFailure) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(handler);
        self
    }

    /// Called once per delivered destination per round.
    pub fn success_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DeliverySuccess) + Send + Sync + 'static,
    {
        self.on_success = Arc::new(handler);
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build without starting the loop; call
    /// [`Dispatcher::start_loop`] later or post manually.
    pub fn disable_auto_start(mut self) -> Self {
        self.config.auto_start = false;
        self
    }

    /// Silence both default handlers.
    pub fn disable_logging(self) -> Self {
        self.disable_error_logging().disable_success_logging()
    }

    pub fn disable_error_logging(mut self) -> Self {
        self.on_failure = silent_failure_handler();
        self
    }

    pub fn disable_success_logging(mut self) -> Self {
        self.on_success = silent_success_handler();
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// Starts the loop unless auto-start was disabled or the interval is
    /// `-1`.
    ///
    /// # Errors
    /// Any [`ConfigError`]; nothing is spawned when building fails.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        if self.bot_lists.is_empty() {
            return Err(ConfigError::NoBotLists);
        }
        let provider = self.provider.ok_or(ConfigError::MissingProvider)?;
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let runtime = match self.scheduler {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };

        let auto_start = self.config.auto_start;
        let dispatcher = Dispatcher::from_parts(
            self.config,
            runtime,
            self.bot_lists,
            provider,
            transport,
            self.on_success,
            self.on_failure,
        );
        if auto_start {
            dispatcher.start_loop();
        }
        Ok(dispatcher)
    }
}

#[cfg(feature = "http")]
fn default_transport() -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(crate::transport::ReqwestTransport::new()))
}

#[cfg(not(feature = "http"))]
fn default_transport() -> Result<Arc<dyn Transport>, ConfigError> {
    Err(ConfigError::MissingTransport)
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field("bot_lists", &self.bot_lists)
            .field("has_provider", &self.provider.is_some())
            .field("has_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}
