// Background refresh scheduler.
// Keeps the commit cache warm with periodic and on-demand refresh cycles.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::cache::CommitCache;
use crate::error::{FeedError, Result};
use crate::feed::{CommitSource, Obfuscator};

use super::status::{RefreshKind, RefreshReport, SchedulerState};

/// Timing knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between periodic refreshes.
    pub interval: Duration,
    /// Bound on a full-history fetch.
    pub full_fetch_timeout: Duration,
    /// Bound on an incremental fetch.
    pub incremental_fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            full_fetch_timeout: Duration::from_secs(10 * 60),
            incremental_fetch_timeout: Duration::from_secs(2 * 60),
        }
    }
}

/// Non-blocking "please refresh" capability handed to the read path.
pub trait RefreshTrigger: Send + Sync {
    fn request_refresh(&self);
}

/// Resets the scheduler to `Idle` however the cycle ends.
struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(SchedulerState::Idle as u8, Ordering::Release);
    }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    fetch: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(after, fetch)
        .await
        .map_err(|_| FeedError::Timeout { operation, after })?
}

/// Drives refresh cycles: source → obfuscator → cache.
pub struct RefreshScheduler<S> {
    cache: Arc<CommitCache>,
    source: S,
    obfuscator: Obfuscator,
    config: SchedulerConfig,
    state: AtomicU8,
    shutdown: watch::Receiver<bool>,
}

impl<S: CommitSource + 'static> RefreshScheduler<S> {
    pub fn new(
        cache: Arc<CommitCache>,
        source: S,
        obfuscator: Obfuscator,
        config: SchedulerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cache,
            source,
            obfuscator,
            config,
            state: AtomicU8::new(SchedulerState::Idle as u8),
            shutdown,
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::Acquire))
    }

    /// Idle → Refreshing. False if a cycle is already running.
    fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(
                SchedulerState::Idle as u8,
                SchedulerState::Refreshing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Run one refresh cycle on the caller's task.
    ///
    /// Failures are logged and returned; the cache is left untouched.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        if !self.try_begin() {
            debug!(state = self.state().display(), "refresh already in flight, skipping");
            return Ok(RefreshReport::Skipped);
        }
        let _idle = IdleOnDrop(&self.state);
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> Result<RefreshReport> {
        let started = Instant::now();
        let result = self.fetch_and_merge().await;

        match &result {
            Ok(RefreshReport::Completed {
                kind,
                fetched,
                merge,
            }) => info!(
                kind = kind.display(),
                fetched,
                inserted = merge.inserted,
                updated = merge.updated,
                total = merge.total,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "commit cache refreshed"
            ),
            Ok(RefreshReport::Skipped) => {}
            Err(e) => error!(error = %e, "commit cache refresh failed, keeping current data"),
        }
        result
    }

    async fn fetch_and_merge(&self) -> Result<RefreshReport> {
        let status = self.cache.status();

        let (kind, records) = match status.last_refreshed.filter(|_| status.len > 0) {
            None => {
                info!("commit cache is empty, fetching full history");
                let records = bounded(
                    "full commit fetch",
                    self.config.full_fetch_timeout,
                    self.source.fetch_all(),
                )
                .await?;
                (RefreshKind::Full, records)
            }
            Some(watermark) => {
                info!(since = %watermark, cached = status.len, "fetching commits since last refresh");
                let records = bounded(
                    "incremental commit fetch",
                    self.config.incremental_fetch_timeout,
                    self.source.fetch_since(watermark),
                )
                .await?;
                (RefreshKind::Incremental, records)
            }
        };

        let fetched = records.len();
        let merge = self.cache.merge(self.obfuscator.obfuscate(records));
        Ok(RefreshReport::Completed {
            kind,
            fetched,
            merge,
        })
    }

    /// Refresh once before returning, then keep refreshing every interval
    /// until shutdown is signalled.
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        if self.refresh().await.is_err() {
            warn!("initial refresh failed, serving an empty or partial commit cache");
        }
        tokio::spawn(async move { self.run_periodic().await })
    }

    async fn run_periodic(&self) {
        let mut shutdown = self.shutdown.clone();
        let period = self.config.interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = period.as_secs(), "periodic commit refresh started");

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.refresh() => {}
                        _ = wait_for_shutdown(&mut shutdown) => {
                            info!("shutdown during refresh, abandoning cycle");
                            break;
                        }
                    }
                }
            }
        }
        info!("periodic commit refresh stopped");
    }

    /// Start a refresh on its own task without waiting for it.
    ///
    /// Returns false when a cycle is already in flight; the request is then
    /// folded into that cycle.
    pub fn refresh_now(self: &Arc<Self>) -> bool {
        if !self.try_begin() {
            debug!("refresh already in flight, request coalesced");
            return false;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _idle = IdleOnDrop(&this.state);
            let mut shutdown = this.shutdown.clone();
            tokio::select! {
                _ = this.run_cycle() => {}
                _ = wait_for_shutdown(&mut shutdown) => {
                    debug!("shutdown requested, abandoning on-demand refresh");
                }
            }
        });
        true
    }
}

impl<S: CommitSource + 'static> RefreshTrigger for Arc<RefreshScheduler<S>> {
    fn request_refresh(&self) {
        self.refresh_now();
    }
}
