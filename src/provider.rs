use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::Snapshot;

/// Source of live bot statistics.
///
/// Implementations wrap whatever client library the bot runs on. Values are
/// queried fresh for every round; the dispatcher never caches them.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Total number of guilds.
    async fn guild_count(&self) -> Result<u64, ProviderError>;

    /// Shard ids running in this process, if sharded.
    async fn shard_ids(&self) -> Result<Option<Vec<u32>>, ProviderError> {
        Ok(None)
    }

    /// Guild count per shard, aligned with [`shard_ids`](Self::shard_ids).
    async fn shard_guild_counts(&self) -> Result<Option<Vec<u64>>, ProviderError> {
        Ok(None)
    }

    /// Stable id of the bot account.
    fn bot_id(&self) -> u64;
}

type CountFn = Arc<dyn Fn() -> Result<u64, ProviderError> + Send + Sync>;
type ShardFn<T> = Arc<dyn Fn() -> Result<Option<Vec<T>>, ProviderError> + Send + Sync>;

/// Closure-backed provider.
///
/// Useful when the bot's client exposes synchronous accessors for its caches.
#[derive(Clone)]
pub struct GenericProvider {
    bot_id: u64,
    guild_count: CountFn,
    shard_ids: ShardFn<u32>,
    shard_guild_counts: ShardFn<u64>,
}

impl GenericProvider {
    /// Provider for an unsharded bot.
    pub fn new<F>(bot_id: u64, guild_count: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        Self::fallible(bot_id, move || Ok(guild_count()))
    }

    /// Provider whose guild count lookup may fail.
    pub fn fallible<F>(bot_id: u64, guild_count: F) -> Self
    where
        F: Fn() -> Result<u64, ProviderError> + Send + Sync + 'static,
    {
        Self {
            bot_id,
            guild_count: Arc::new(guild_count),
            shard_ids: Arc::new(|| Ok::<_, ProviderError>(None)),
            shard_guild_counts: Arc::new(|| Ok::<_, ProviderError>(None)),
        }
    }

    /// Add per-shard lookups.
    pub fn with_shards<I, C>(mut self, shard_ids: I, shard_guild_counts: C) -> Self
    where
        I: Fn() -> Vec<u32> + Send + Sync + 'static,
        C: Fn() -> Vec<u64> + Send + Sync + 'static,
    {
        self.shard_ids = Arc::new(move || Ok::<_, ProviderError>(Some(shard_ids())));
        self.shard_guild_counts = Arc::new(move || Ok::<_, ProviderError>(Some(shard_guild_counts())));
        self
    }
}

impl fmt::Debug for GenericProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericProvider")
            .field("bot_id", &self.bot_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StatsProvider for GenericProvider {
    async fn guild_count(&self) -> Result<u64, ProviderError> {
        (self.guild_count)()
    }

    async fn shard_ids(&self) -> Result<Option<Vec<u32>>, ProviderError> {
        (self.shard_ids)()
    }

    async fn shard_guild_counts(&self) -> Result<Option<Vec<u64>>, ProviderError> {
        (self.shard_guild_counts)()
    }

    fn bot_id(&self) -> u64 {
        self.bot_id
    }
}

/// Turns a [`StatsProvider`] into validated [`Snapshot`]s.
#[derive(Clone)]
pub struct SnapshotBuilder {
    provider: Arc<dyn StatsProvider>,
}

impl SnapshotBuilder {
    pub fn new(provider: Arc<dyn StatsProvider>) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &Arc<dyn StatsProvider> {
        &self.provider
    }

    /// Query the provider and assemble a snapshot.
    ///
    /// # Errors
    /// Propagates any provider error, and returns
    /// [`ProviderError::ShardMismatch`] when shard ids are reported without
    /// an equally long list of per-shard guild counts.
    pub async fn compute(&self) -> Result<Snapshot, ProviderError> {
        let guild_count = self.provider.guild_count().await?;
        let shard_ids = self.provider.shard_ids().await?;
        let shard_guild_counts = self.provider.shard_guild_counts().await?;

        if let Some(ids) = &shard_ids {
            let counts = shard_guild_counts.as_ref().map_or(0, Vec::len);
            if counts != ids.len() || shard_guild_counts.is_none() {
                return Err(ProviderError::ShardMismatch {
                    ids: ids.len(),
                    counts,
                });
            }
        }

        Ok(Snapshot {
            guild_count,
            shard_ids,
            shard_guild_counts,
        })
    }
}

impl fmt::Debug for SnapshotBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotBuilder")
            .field("bot_id", &self.provider.bot_id())
            .finish()
    }
}
