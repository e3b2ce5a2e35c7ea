//! Ingestion job tracking.
//!
//! Submits file batches and runs one poll loop per job. Each loop is a spawned
//! task with its own cancellation token, stored in a map owned by the tracker,
//! and ends exactly once: on a terminal status, on a failed poll, or on
//! tracker shutdown.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{JobId, UploadJob};
use crate::api::{ServerApi, UploadFile};
use crate::config::DEFAULT_JOB_INTERVAL_MS;
use crate::error::{ConsoleError, Result};

/// Notifications emitted by poll loops.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// A poll merged into a still-running job.
    Updated(UploadJob),
    /// The job reached `completed` or `failed`; its loop has stopped.
    Completed(UploadJob),
    /// A poll request failed; the loop stopped and the job keeps its last state.
    PollAbandoned { job_id: JobId, error: ConsoleError },
}

/// Jobs in submission order.
#[derive(Default)]
struct JobTable {
    jobs: HashMap<JobId, UploadJob>,
    order: Vec<JobId>,
}

struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

type Pollers = Arc<Mutex<HashMap<JobId, PollHandle>>>;

/// Tracks ingestion jobs and polls each one until it finishes.
pub struct IngestionJobTracker {
    api: Arc<dyn ServerApi>,
    interval: Duration,
    jobs: Arc<RwLock<JobTable>>,
    pollers: Pollers,
    events: mpsc::UnboundedSender<JobEvent>,
    shutdown: CancellationToken,
}

impl IngestionJobTracker {
    /// Creates a tracker polling at the default 2 second interval.
    ///
    /// Returns the receiving end of the job event stream.
    pub fn new(api: Arc<dyn ServerApi>) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        Self::with_interval(api, Duration::from_millis(DEFAULT_JOB_INTERVAL_MS))
    }

    /// Creates a tracker polling at a custom interval.
    pub fn with_interval(
        api: Arc<dyn ServerApi>,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let tracker = Self {
            api,
            interval,
            jobs: Arc::new(RwLock::new(JobTable::default())),
            pollers: Arc::new(Mutex::new(HashMap::new())),
            events,
            shutdown: CancellationToken::new(),
        };
        (tracker, receiver)
    }

    /// Uploads a batch and starts polling the job the server created for it.
    pub async fn submit_batch(&self, files: Vec<UploadFile>) -> Result<JobId> {
        if files.is_empty() {
            return Err(ConsoleError::validation("Select at least one file to upload"));
        }
        if self.shutdown.is_cancelled() {
            return Err(ConsoleError::internal("Job tracker has been shut down"));
        }

        let file_names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let response = self.api.upload_documents(files).await?;

        let job_id = response
            .job_id
            .filter(|id| !id.trim().is_empty())
            .map(JobId::new)
            .ok_or_else(|| ConsoleError::malformed("Upload response is missing job_id"))?;
        let total_files = response
            .total_files
            .unwrap_or(file_names.len() as u64);

        {
            let mut table = write_table(&self.jobs);
            if table.jobs.contains_key(&job_id) {
                return Err(ConsoleError::malformed(format!(
                    "Server reused job id {}",
                    job_id
                )));
            }
            table.order.push(job_id.clone());
            table.jobs.insert(
                job_id.clone(),
                UploadJob::queued(job_id.clone(), total_files, file_names),
            );
        }

        info!("Started ingestion job {} ({} files)", job_id, total_files);
        self.spawn_poller(job_id.clone());
        Ok(job_id)
    }

    fn spawn_poller(&self, job_id: JobId) {
        let cancel = self.shutdown.child_token();
        let poll = PollLoop {
            api: Arc::clone(&self.api),
            jobs: Arc::clone(&self.jobs),
            pollers: Arc::clone(&self.pollers),
            events: self.events.clone(),
            job_id: job_id.clone(),
            interval: self.interval,
            cancel: cancel.clone(),
        };

        // Held across spawn so the loop cannot deregister before it is registered.
        let mut pollers = lock_pollers(&self.pollers);
        let task = tokio::spawn(poll.run());
        pollers.insert(job_id, PollHandle { cancel, task });
    }

    /// Snapshot of one job.
    pub fn job(&self, job_id: &JobId) -> Option<UploadJob> {
        read_table(&self.jobs).jobs.get(job_id).cloned()
    }

    /// Snapshots of all jobs, in submission order.
    pub fn jobs(&self) -> Vec<UploadJob> {
        let table = read_table(&self.jobs);
        table
            .order
            .iter()
            .filter_map(|id| table.jobs.get(id).cloned())
            .collect()
    }

    /// Whether a poll loop is still running for the job.
    pub fn is_polling(&self, job_id: &JobId) -> bool {
        lock_pollers(&self.pollers).contains_key(job_id)
    }

    /// Number of running poll loops.
    pub fn active_pollers(&self) -> usize {
        lock_pollers(&self.pollers).len()
    }

    /// Stops one job's poll loop. Returns false if it was not running.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match lock_pollers(&self.pollers).remove(job_id) {
            Some(handle) => {
                handle.cancel.cancel();
                debug!("Cancelled polling for job {}", job_id);
                true
            }
            None => false,
        }
    }

    /// Cancels every poll loop and waits for the tasks to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<PollHandle> = lock_pollers(&self.pollers)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        if !handles.is_empty() {
            info!("Stopping {} job poll loop(s)", handles.len());
        }
        join_all(handles.into_iter().map(|h| h.task)).await;
    }
}

impl Drop for IngestionJobTracker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// State owned by one job's poll task.
struct PollLoop {
    api: Arc<dyn ServerApi>,
    jobs: Arc<RwLock<JobTable>>,
    pollers: Pollers,
    events: mpsc::UnboundedSender<JobEvent>,
    job_id: JobId,
    interval: Duration,
    cancel: CancellationToken,
}

impl PollLoop {
    async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Discarding in-flight poll for cancelled job {}", self.job_id);
                    break;
                }
                response = self.api.ingestion_status(self.job_id.as_str()) => response,
            };

            match response {
                Ok(status) => {
                    let snapshot = {
                        let mut table = write_table(&self.jobs);
                        let Some(job) = table.jobs.get_mut(&self.job_id) else {
                            break;
                        };
                        job.merge(&status);
                        job.clone()
                    };

                    debug!("{}", snapshot.summary());
                    if snapshot.is_terminal() {
                        info!("Ingestion job finished: {}", snapshot.summary());
                        let _ = self.events.send(JobEvent::Completed(snapshot));
                        break;
                    }
                    let _ = self.events.send(JobEvent::Updated(snapshot));
                }
                Err(error) => {
                    warn!(
                        "Polling job {} failed, giving up on it: {}",
                        self.job_id, error
                    );
                    let _ = self.events.send(JobEvent::PollAbandoned {
                        job_id: self.job_id.clone(),
                        error,
                    });
                    break;
                }
            }
        }

        self.cancel.cancel();
        lock_pollers(&self.pollers).remove(&self.job_id);
    }
}

fn read_table(jobs: &RwLock<JobTable>) -> std::sync::RwLockReadGuard<'_, JobTable> {
    jobs.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_table(jobs: &RwLock<JobTable>) -> std::sync::RwLockWriteGuard<'_, JobTable> {
    jobs.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock_pollers(pollers: &Mutex<HashMap<JobId, PollHandle>>) -> MutexGuard<'_, HashMap<JobId, PollHandle>> {
    pollers.lock().unwrap_or_else(PoisonError::into_inner)
}
