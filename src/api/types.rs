//! Wire types for the query server's JSON API.
//!
//! Every externally-sourced field is optional here. Callers resolve absent
//! values through the accessor methods, which apply the named fallbacks.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConsoleError, Result};
use crate::schema::SchemaSnapshot;

/// Fallback for any absent counter.
pub const DEFAULT_COUNT: u64 = 0;

/// Fallback for an absent rate.
pub const DEFAULT_RATE: f64 = 0.0;

/// Fallback for an absent connectivity flag.
pub const DEFAULT_CONNECTED: bool = false;

/// A file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name reported to the server.
    pub name: String,
    /// File contents.
    pub content: Vec<u8>,
    /// MIME type, if known.
    pub mime: Option<String>,
}

impl UploadFile {
    /// Creates an upload file from in-memory contents.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mime: None,
        }
    }

    /// Sets the MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Reads a file from disk, guessing the MIME type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ConsoleError::validation(format!("Not a file path: {}", path.display()))
            })?
            .to_string();

        let content = tokio::fs::read(path).await.map_err(|e| {
            ConsoleError::validation(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let file = Self::new(name, content);
        Ok(match mime_for_extension(path) {
            Some(mime) => file.with_mime(mime),
            None => file,
        })
    }
}

/// MIME type guessed from the file extension.
fn mime_for_extension(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Request body for `POST /api/connect-database`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest<'a> {
    pub connection_string: &'a str,
}

/// Response of `POST /api/connect-database`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub schema: Option<SchemaSnapshot>,
    #[serde(default)]
    pub tables_count: Option<u64>,
    #[serde(default)]
    pub relationships_count: Option<u64>,
}

/// Response of `POST /api/upload-documents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a single file inside an ingestion job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileOutcome {
    #[serde(default)]
    pub filename: String,
    /// "success" or "failed".
    #[serde(default)]
    pub status: Option<String>,
    /// Number of chunks indexed from the file.
    #[serde(default)]
    pub chunks: Option<u64>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// Response of `GET /api/ingestion-status/{job_id}`: a partial job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub processed_files: Option<u64>,
    #[serde(default)]
    pub failed_files: Option<u64>,
    #[serde(default)]
    pub files: Option<Vec<FileOutcome>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for `POST /api/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
}

/// One entry of `GET /api/query/history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub cached: bool,
    /// Server processing time in seconds.
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response of `GET /api/metrics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsResponse {
    #[serde(default)]
    pub database_connected: Option<bool>,
    #[serde(default)]
    pub documents_indexed: Option<u64>,
    #[serde(default)]
    pub cache_hit_rate: Option<f64>,
    #[serde(default)]
    pub active_jobs: Option<u64>,
    #[serde(default)]
    pub cache_size: Option<u64>,
}

/// Response of `GET /api/schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaResponse {
    #[serde(default)]
    pub schema: Option<SchemaSnapshot>,
    #[serde(default)]
    pub stats: Option<SchemaStats>,
}

/// Counters attached to `GET /api/schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaStats {
    #[serde(default)]
    pub tables: Option<u64>,
    #[serde(default)]
    pub relationships: Option<u64>,
    #[serde(default)]
    pub documents_indexed: Option<u64>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub database_connected: Option<bool>,
    #[serde(default)]
    pub documents_indexed: Option<u64>,
}

impl HealthResponse {
    /// True when the server reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.as_deref() == Some("healthy")
    }
}
