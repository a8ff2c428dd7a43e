use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::DispatcherConfig;
use crate::destination::Destination;
use crate::error::DispatchError;
use crate::provider::{SnapshotBuilder, StatsProvider};
use crate::transport::Transport;
use crate::types::{DispatchContext, PostSummary, Snapshot};
use crate::worker::{deliver, DeliveryContext, DeliveryOutcome, FailureHandler, SuccessHandler};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Posts bot statistics to every registered bot list, on a schedule or on
/// demand.
///
/// Built by [`DispatcherBuilder`](crate::DispatcherBuilder). The handle is
/// cheap to clone; all clones share one loop and one runtime state. Dropping
/// the last clone cancels the loop.
#[derive(Clone)]
#[must_use = "dropping the last Dispatcher handle cancels its posting loop"]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: DispatcherConfig,
    runtime: Handle,
    bot_lists: Vec<Arc<dyn Destination>>,
    snapshots: SnapshotBuilder,
    delivery: Arc<DeliveryContext>,
    state: RwLock<PostState>,
    job: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct PostState {
    last_post: Option<DateTime<Utc>>,
    last_snapshot: Option<Snapshot>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let job = self.job.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = job.take() {
            handle.abort();
        }
    }
}

impl Dispatcher {
    pub(crate) fn from_parts(
        config: DispatcherConfig,
        runtime: Handle,
        bot_lists: Vec<Arc<dyn Destination>>,
        provider: Arc<dyn StatsProvider>,
        transport: Arc<dyn Transport>,
        on_success: SuccessHandler,
        on_failure: FailureHandler,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                runtime,
                bot_lists,
                snapshots: SnapshotBuilder::new(provider),
                delivery: Arc::new(DeliveryContext {
                    transport,
                    on_success,
                    on_failure,
                }),
                state: RwLock::new(PostState::default()),
                job: Mutex::new(None),
            }),
        }
    }

    /// Configured interval in milliseconds; `-1` when the loop is disabled.
    pub fn interval(&self) -> i64 {
        self.inner.config.interval_ms
    }

    /// Delay before the first scheduled round after [`start_loop`](Self::start_loop).
    pub fn initial_delay(&self) -> Duration {
        self.inner.config.initial_delay()
    }

    /// Registered bot lists, in dispatch order.
    pub fn bot_lists(&self) -> &[Arc<dyn Destination>] {
        &self.inner.bot_lists
    }

    pub fn shard_mode(&self) -> bool {
        self.inner.config.shard_mode
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// Runtime the loop and delivery tasks run on.
    pub fn scheduler(&self) -> &Handle {
        &self.inner.runtime
    }

    pub fn stats_provider(&self) -> &Arc<dyn StatsProvider> {
        self.inner.snapshots.provider()
    }

    /// When the most recent round finished, if any has.
    pub async fn last_post(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_post
    }

    /// Snapshot computed by the most recent round.
    pub async fn last_sent_statistics(&self) -> Option<Snapshot> {
        self.inner.state.read().await.last_snapshot.clone()
    }

    /// Whether the posting loop is scheduled.
    pub fn is_running(&self) -> bool {
        is_live(&self.lock_job())
    }

    /// Run one delivery round now.
    ///
    /// Computes a snapshot, sends it to every bot list concurrently, and
    /// resolves once every list has reported through its success or failure
    /// handler. Works whether or not the loop is running.
    ///
    /// Each delivery runs in its own task, so dropping the returned future
    /// does not cancel requests already dispatched.
    ///
    /// # Errors
    /// Only [`DispatchError::Provider`], when no snapshot could be computed.
    /// Per-list failures are reported to the failure handler and counted in
    /// the returned [`PostSummary`].
    pub async fn post(&self) -> Result<PostSummary, DispatchError> {
        metric_inc("stats.post.rounds");

        let snapshot = match self.inner.snapshots.compute().await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "skipping stats round");
                return Err(err.into());
            }
        };
        self.inner.state.write().await.last_snapshot = Some(Snapshot::clone(&snapshot));

        let ctx = DispatchContext {
            shard_mode: self.inner.config.shard_mode,
            bot_id: self.stats_provider().bot_id(),
        };

        let handles: Vec<(String, JoinHandle<DeliveryOutcome>)> = self
            .inner
            .bot_lists
            .iter()
            .map(|destination| {
                let task = deliver(
                    Arc::clone(destination),
                    Arc::clone(&snapshot),
                    ctx,
                    Arc::clone(&self.inner.delivery),
                );
                (destination.name().to_string(), self.inner.runtime.spawn(task))
            })
            .collect();

        let mut summary = PostSummary::default();
        for (name, handle) in handles {
            match handle.await {
                Ok(DeliveryOutcome::Delivered) => summary.delivered += 1,
                Ok(DeliveryOutcome::Failed) => summary.failed += 1,
                Err(err) => {
                    tracing::error!(destination = %name, error = %err, "delivery task aborted");
                    summary.failed += 1;
                }
            }
        }

        let finished = Utc::now();
        {
            let mut state = self.inner.state.write().await;
            // Overlapping rounds may finish out of order.
            state.last_post = Some(state.last_post.map_or(finished, |prev| prev.max(finished)));
        }

        tracing::debug!(
            guild_count = snapshot.guild_count,
            delivered = summary.delivered,
            failed = summary.failed,
            "stats round complete"
        );
        Ok(summary)
    }

    /// Schedule fixed-rate rounds.
    ///
    /// The first round fires after the initial delay, then once per
    /// interval, regardless of how long each round takes. Does nothing when
    /// the loop is already running or the interval is `-1`.
    pub fn start_loop(&self) {
        let Some(period) = self.inner.config.interval() else {
            tracing::debug!("stats loop disabled, manual posting only");
            return;
        };

        let mut job = self.lock_job();
        if is_live(&job) {
            return;
        }

        let initial_delay = self.inner.config.initial_delay();
        let handle = self.inner.runtime.spawn(run_loop(
            Arc::downgrade(&self.inner),
            initial_delay,
            period,
        ));
        *job = Some(handle);

        tracing::info!(
            interval_ms = period.as_millis() as u64,
            initial_delay_ms = initial_delay.as_millis() as u64,
            bot_lists = self.inner.bot_lists.len(),
            "stats loop started"
        );
    }

    /// Cancel future rounds. Rounds already in flight run to completion.
    pub fn stop_loop(&self) {
        let mut job = self.lock_job();
        if let Some(handle) = job.take() {
            handle.abort();
            tracing::info!("stats loop stopped");
        }
    }

    fn lock_job(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.job.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.inner.config)
            .field("bot_lists", &self.inner.bot_lists)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn is_live(job: &Option<JoinHandle<()>>) -> bool {
    job.as_ref().is_some_and(|handle| !handle.is_finished())
}

/// Timer loop. Holds only a weak reference so an abandoned dispatcher can
/// be dropped; each tick's round runs in its own task.
async fn run_loop(inner: Weak<Inner>, initial_delay: Duration, period: Duration) {
    let mut ticker = interval_at(Instant::now() + initial_delay, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        ticker.tick().await;

        let Some(inner) = inner.upgrade() else { break };
        let runtime = inner.runtime.clone();
        let dispatcher = Dispatcher { inner };
        runtime.spawn(async move {
            if let Err(err) = dispatcher.post().await {
                tracing::error!(error = %err, "scheduled stats round failed");
            }
        });
    }
}
