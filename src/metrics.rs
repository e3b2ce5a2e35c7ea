//! Periodic system metrics.
//!
//! One background loop fetches `/api/metrics` on a fixed interval and
//! publishes the result through a `watch` channel. On-demand refreshes share
//! the loop's sequence counter: every fetch takes a ticket before its request
//! and its response is applied only if no later-ticketed response has been
//! applied already, so an out-of-order reply never overwrites a newer one.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{MetricsResponse, ServerApi, DEFAULT_CONNECTED, DEFAULT_COUNT, DEFAULT_RATE};
use crate::config::DEFAULT_METRICS_INTERVAL_SECS;
use crate::error::Result;

/// Aggregate system health as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub database_connected: bool,
    pub documents_indexed: u64,
    /// Always within [0, 1].
    pub cache_hit_rate: f64,
    pub active_jobs: u64,
    /// Entries in the server's query cache.
    pub cache_size: u64,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            database_connected: DEFAULT_CONNECTED,
            documents_indexed: DEFAULT_COUNT,
            cache_hit_rate: DEFAULT_RATE,
            active_jobs: DEFAULT_COUNT,
            cache_size: DEFAULT_COUNT,
        }
    }
}

impl From<&MetricsResponse> for MetricsSnapshot {
    fn from(response: &MetricsResponse) -> Self {
        let rate = response.cache_hit_rate.unwrap_or(DEFAULT_RATE);
        Self {
            database_connected: response.database_connected.unwrap_or(DEFAULT_CONNECTED),
            documents_indexed: response.documents_indexed.unwrap_or(DEFAULT_COUNT),
            cache_hit_rate: if rate.is_nan() {
                DEFAULT_RATE
            } else {
                rate.clamp(0.0, 1.0)
            },
            active_jobs: response.active_jobs.unwrap_or(DEFAULT_COUNT),
            cache_size: response.cache_size.unwrap_or(DEFAULT_COUNT),
        }
    }
}

struct Shared {
    api: Arc<dyn ServerApi>,
    snapshot: watch::Sender<Option<MetricsSnapshot>>,
    next_ticket: AtomicU64,
    applied_ticket: AtomicU64,
}

impl Shared {
    /// Fetches once. Returns whether the response was applied.
    async fn fetch(&self) -> Result<bool> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::AcqRel) + 1;
        let response = self.api.metrics().await?;
        let fresh = MetricsSnapshot::from(&response);

        // send_if_modified runs the closure under the channel's write lock,
        // which serializes ticket checks.
        let applied = self.snapshot.send_if_modified(|current| {
            if ticket <= self.applied_ticket.load(Ordering::Acquire) {
                return false;
            }
            self.applied_ticket.store(ticket, Ordering::Release);
            *current = Some(fresh);
            true
        });

        if applied {
            debug!("Metrics updated (ticket {})", ticket);
        } else {
            debug!("Discarding stale metrics response (ticket {})", ticket);
        }
        Ok(applied)
    }
}

struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Polls system metrics and republishes them as one snapshot.
pub struct MetricsPoller {
    shared: Arc<Shared>,
    interval: Duration,
    running: Mutex<Option<LoopHandle>>,
}

impl MetricsPoller {
    /// Creates a poller with the default 10 second interval.
    pub fn new(api: Arc<dyn ServerApi>) -> Self {
        Self::with_interval(api, Duration::from_secs(DEFAULT_METRICS_INTERVAL_SECS))
    }

    pub fn with_interval(api: Arc<dyn ServerApi>, interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                api,
                snapshot,
                next_ticket: AtomicU64::new(0),
                applied_ticket: AtomicU64::new(0),
            }),
            interval,
            running: Mutex::new(None),
        }
    }

    /// Latest snapshot; `None` until the first successful fetch.
    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        *self.shared.snapshot.borrow()
    }

    /// Subscribes to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Option<MetricsSnapshot>> {
        self.shared.snapshot.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Starts the periodic loop. The first fetch happens immediately.
    /// Does nothing if the loop is already running.
    pub fn start(&self) {
        let mut running = self.lock_running();
        if running.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            self.interval,
            cancel.clone(),
        ));
        info!("Metrics polling every {:?}", self.interval);
        *running = Some(LoopHandle { cancel, task });
    }

    /// Stops the periodic loop and waits for it to exit.
    pub async fn stop(&self) {
        let handle = self.lock_running().take();
        if let Some(handle) = handle {
            handle.cancel.cancel();
            let _ = handle.task.await;
            debug!("Metrics polling stopped");
        }
    }

    /// Fetches metrics now. Returns whether the response was applied.
    pub async fn refresh(&self) -> Result<bool> {
        self.shared.fetch().await
    }

    /// Fetches metrics in the background; failures are logged.
    pub fn trigger_refresh(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            if let Err(e) = shared.fetch().await {
                warn!("Metrics refresh failed: {}", e);
            }
        })
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<LoopHandle>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MetricsPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_running().take() {
            handle.cancel.cancel();
        }
    }
}

async fn run_loop(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = shared.fetch() => result,
        };

        if let Err(e) = result {
            warn!("Metrics poll failed, keeping previous snapshot: {}", e);
        }
    }
}
