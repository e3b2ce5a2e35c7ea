//! Query server API abstraction.
//!
//! Provides a trait-based interface over the server's HTTP endpoints so the
//! stateful components can run against the real server or an in-memory mock.

mod http;
mod mock;
mod types;

pub use http::HttpServerApi;
pub use mock::{MockServerApi, StatusStep};
pub use types::{
    ConnectRequest, ConnectResponse, FileOutcome, HealthResponse, HistoryEntry,
    JobStatusResponse, MetricsResponse, QueryRequest, SchemaResponse, SchemaStats, UploadFile,
    UploadResponse, DEFAULT_CONNECTED, DEFAULT_COUNT, DEFAULT_RATE,
};

use crate::error::Result;
use crate::query::QueryResultEnvelope;
use async_trait::async_trait;

/// Trait defining the server operations the client consumes.
///
/// Every call is one request; none of them retry or time out.
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// Connects the server to a database and returns the discovered schema.
    async fn connect_database(&self, connection_string: &str) -> Result<ConnectResponse>;

    /// Uploads a batch of files, starting a server-side ingestion job.
    async fn upload_documents(&self, files: Vec<UploadFile>) -> Result<UploadResponse>;

    /// Fetches the current state of an ingestion job.
    async fn ingestion_status(&self, job_id: &str) -> Result<JobStatusResponse>;

    /// Submits a natural-language query.
    async fn query(&self, text: &str) -> Result<QueryResultEnvelope>;

    /// Fetches the recent query history.
    async fn query_history(&self) -> Result<Vec<HistoryEntry>>;

    /// Fetches aggregate system metrics.
    async fn metrics(&self) -> Result<MetricsResponse>;

    /// Fetches the schema of the currently connected database.
    async fn schema(&self) -> Result<SchemaResponse>;

    /// Probes server health.
    async fn health(&self) -> Result<HealthResponse>;
}
