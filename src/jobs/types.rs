//! Ingestion job types.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::api::{FileOutcome, JobStatusResponse};

/// Server-assigned identifier of an ingestion job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lifecycle of an ingestion job: `queued → processing → {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Parses a server status string. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// True for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` goes forward.
    ///
    /// Terminal states are final; staying in place is allowed.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side view of one ingestion job.
///
/// Created on submission and only changed through [`UploadJob::merge`].
/// `processed_files + failed_files <= total_files` holds in every state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadJob {
    id: JobId,
    status: JobStatus,
    total_files: u64,
    processed_files: u64,
    failed_files: u64,
    file_names: Vec<String>,
    file_results: Vec<FileOutcome>,
    error: Option<String>,
}

/// What a merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub status_changed: bool,
    pub counts_changed: bool,
    /// The response carried counts that would break the counter invariant.
    pub counts_rejected: bool,
}

impl UploadJob {
    /// Creates a freshly submitted job in the `queued` state.
    pub fn queued(id: JobId, total_files: u64, file_names: Vec<String>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            total_files,
            processed_files: 0,
            failed_files: 0,
            file_names,
            file_results: Vec::new(),
            error: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    pub fn processed_files(&self) -> u64 {
        self.processed_files
    }

    pub fn failed_files(&self) -> u64 {
        self.failed_files
    }

    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Per-file outcomes, available once the server reports them.
    pub fn file_results(&self) -> &[FileOutcome] {
        &self.file_results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Share of files handled so far, 0..=100.
    pub fn percent_complete(&self) -> u8 {
        if self.total_files == 0 {
            return if self.is_terminal() { 100 } else { 0 };
        }
        let done = self
            .processed_files
            .saturating_add(self.failed_files)
            .min(self.total_files);
        (u128::from(done) * 100 / u128::from(self.total_files)) as u8
    }

    /// One-line progress description.
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {}/{} processed, {} failed ({}%)",
            self.id,
            self.status,
            self.processed_files,
            self.total_files,
            self.failed_files,
            self.percent_complete()
        )
    }

    /// Merges a poll response field by field.
    ///
    /// Absent fields keep their value, the status never moves backward and
    /// an unknown status string is ignored. Counts that would break
    /// `processed + failed <= total` are dropped as a group.
    pub fn merge(&mut self, response: &JobStatusResponse) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        if let Some(raw) = response.status.as_deref() {
            match JobStatus::parse(raw) {
                Some(next) if self.status.can_advance_to(next) => {
                    outcome.status_changed = next != self.status;
                    self.status = next;
                }
                Some(next) => {
                    warn!(
                        "Job {}: ignoring status regression {} -> {}",
                        self.id, self.status, next
                    );
                }
                None => warn!("Job {}: ignoring unknown status '{}'", self.id, raw),
            }
        }

        let total = response.total_files.unwrap_or(self.total_files);
        let processed = response.processed_files.unwrap_or(self.processed_files);
        let failed = response.failed_files.unwrap_or(self.failed_files);

        if processed.saturating_add(failed) <= total {
            outcome.counts_changed = (total, processed, failed)
                != (self.total_files, self.processed_files, self.failed_files);
            self.total_files = total;
            self.processed_files = processed;
            self.failed_files = failed;
        } else {
            warn!(
                "Job {}: ignoring counts processed={} failed={} total={}",
                self.id, processed, failed, total
            );
            outcome.counts_rejected = true;
        }

        // The server reports an empty list until files are processed.
        if let Some(files) = response.files.as_ref().filter(|f| !f.is_empty()) {
            self.file_names = files.iter().map(|f| f.filename.clone()).collect();
            self.file_results = files.clone();
        }

        if let Some(error) = &response.error {
            self.error = Some(error.clone());
        }

        outcome
    }
}
