//! Ingestion jobs: client-side job state and the per-job poll loops.

mod tracker;
mod types;

pub use tracker::{IngestionJobTracker, JobEvent};
pub use types::{JobId, JobStatus, MergeOutcome, UploadJob};
