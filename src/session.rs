//! Client session.
//!
//! Wires the components together the way the console uses them: job
//! completions and successful queries trigger a metrics refresh, and query
//! envelopes are handed to a [`ResultAdapter`].

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{HttpServerApi, ServerApi, UploadFile};
use crate::config::{Config, PollingConfig};
use crate::error::{ConsoleError, Result};
use crate::gateway::{ConnectionGateway, ConnectionSummary};
use crate::jobs::{IngestionJobTracker, JobEvent, JobId, UploadJob};
use crate::metrics::MetricsPoller;
use crate::query::QuerySubmitter;
use crate::results::ResultAdapter;

/// Capacity of the job event broadcast channel.
const JOB_EVENT_CAPACITY: usize = 64;

/// All client components sharing one server connection.
pub struct Session {
    gateway: ConnectionGateway,
    tracker: IngestionJobTracker,
    submitter: QuerySubmitter,
    metrics: Arc<MetricsPoller>,
    job_events: broadcast::Sender<JobEvent>,
    tracker_events: Mutex<Option<mpsc::UnboundedReceiver<JobEvent>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Session {
    /// Creates a session over any server API implementation.
    pub fn new(api: Arc<dyn ServerApi>, polling: &PollingConfig) -> Self {
        let (tracker, tracker_events) =
            IngestionJobTracker::with_interval(Arc::clone(&api), polling.job_interval());
        let (job_events, _) = broadcast::channel(JOB_EVENT_CAPACITY);

        Self {
            gateway: ConnectionGateway::new(Arc::clone(&api)),
            submitter: QuerySubmitter::new(Arc::clone(&api)),
            metrics: Arc::new(MetricsPoller::with_interval(api, polling.metrics_interval())),
            tracker,
            job_events,
            tracker_events: Mutex::new(Some(tracker_events)),
            forwarder: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a session talking HTTP to the configured server.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = HttpServerApi::from_config(&config.server)?;
        info!("Using query server at {}", api.base_url());
        Ok(Self::new(Arc::new(api), &config.polling))
    }

    /// Starts metrics polling and job event handling.
    pub fn start(&self) {
        self.metrics.start();
        self.ensure_forwarder();
    }

    /// Spawns the task draining tracker events, once.
    ///
    /// Runs on first use as well as from [`Session::start`], so uploads and
    /// waits work on a session whose metrics polling was never started.
    fn ensure_forwarder(&self) {
        let Some(mut events) = self
            .tracker_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        let metrics = Arc::clone(&self.metrics);
        let outgoing = self.job_events.clone();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                if let JobEvent::Completed(job) = &event {
                    debug!("Job {} finished, refreshing metrics", job.id());
                    metrics.trigger_refresh();
                }
                // No subscribers is fine.
                let _ = outgoing.send(event);
            }
        });
        *self.forwarder.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    /// Stops every background task and waits for them.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.shutdown().await;
        self.metrics.stop().await;
        let forwarder = self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = forwarder {
            let _ = task.await;
        }
        info!("Session closed");
    }

    pub fn gateway(&self) -> &ConnectionGateway {
        &self.gateway
    }

    pub fn tracker(&self) -> &IngestionJobTracker {
        &self.tracker
    }

    pub fn submitter(&self) -> &QuerySubmitter {
        &self.submitter
    }

    pub fn metrics(&self) -> &MetricsPoller {
        &self.metrics
    }

    /// Subscribes to job events.
    pub fn subscribe_jobs(&self) -> broadcast::Receiver<JobEvent> {
        self.job_events.subscribe()
    }

    pub async fn connect(&self, connection_string: &str) -> Result<ConnectionSummary> {
        self.gateway.connect(connection_string).await
    }

    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<JobId> {
        self.ensure_forwarder();
        self.tracker.submit_batch(files).await
    }

    /// Runs a query and wraps the envelope for display.
    pub async fn query(&self, text: &str) -> Result<ResultAdapter> {
        let envelope = self.submitter.submit(text).await?;
        if !envelope.is_error() {
            self.metrics.trigger_refresh();
        }
        Ok(ResultAdapter::new(envelope))
    }

    /// Waits until a job reaches a terminal status.
    ///
    /// Fails if polling for the job stops first.
    pub async fn wait_for_job(&self, job_id: &JobId) -> Result<UploadJob> {
        let mut events = self.job_events.subscribe();
        self.ensure_forwarder();
        loop {
            let job = self
                .tracker
                .job(job_id)
                .ok_or_else(|| ConsoleError::validation(format!("Unknown job {}", job_id)))?;
            if job.is_terminal() {
                return Ok(job);
            }
            if !self.tracker.is_polling(job_id) {
                return Err(ConsoleError::internal(format!(
                    "Polling for job {} stopped before it finished",
                    job_id
                )));
            }

            match events.recv().await {
                Ok(JobEvent::PollAbandoned { job_id: id, error }) if &id == job_id => {
                    return Err(error);
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ConsoleError::internal("Session closed"));
                }
            }
        }
    }
}
