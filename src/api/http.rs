//! HTTP implementation of the server API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::types::{
    ConnectRequest, ConnectResponse, HealthResponse, HistoryEntry, JobStatusResponse,
    MetricsResponse, QueryRequest, SchemaResponse, UploadFile, UploadResponse,
};
use super::ServerApi;
use crate::config::ServerConfig;
use crate::error::{ConsoleError, Result};
use crate::query::QueryResultEnvelope;

/// Server API client over reqwest.
///
/// No request timeout is configured: a hung response stalls only the caller
/// awaiting it.
#[derive(Debug, Clone)]
pub struct HttpServerApi {
    base_url: Url,
    client: Client,
}

impl HttpServerApi {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ConsoleError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Creates a client from the `[server]` config section.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::new(config.url()?)
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL below the base URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConsoleError::config(format!("Base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, op: &'static str, request: RequestBuilder) -> Result<Response> {
        debug!("{} request", op);
        request.send().await.map_err(map_transport_error)
    }

    /// Reads a JSON body, turning non-success statuses into server errors.
    async fn read_json<T: DeserializeOwned>(
        op: &'static str,
        fallback: &'static str,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConsoleError::transport(format!("Failed to read response: {}", e)))?;

        debug!("{} response: {}", op, status);

        if !status.is_success() {
            return Err(server_error(status, &body, fallback));
        }

        serde_json::from_str(&body)
            .map_err(|e| ConsoleError::malformed(format!("{}: {}", op, e)))
    }
}

#[async_trait]
impl ServerApi for HttpServerApi {
    async fn connect_database(&self, connection_string: &str) -> Result<ConnectResponse> {
        let url = self.endpoint(&["api", "connect-database"])?;
        let request = self
            .client
            .post(url)
            .json(&ConnectRequest { connection_string });
        let response = self.send("connect", request).await?;
        Self::read_json("connect", "Database connection failed", response).await
    }

    async fn upload_documents(&self, files: Vec<UploadFile>) -> Result<UploadResponse> {
        let url = self.endpoint(&["api", "upload-documents"])?;
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.content).file_name(file.name);
            let part = match file.mime {
                Some(mime) => part
                    .mime_str(&mime)
                    .map_err(|e| ConsoleError::validation(format!("Invalid MIME type: {}", e)))?,
                None => part,
            };
            form = form.part("files", part);
        }
        let response = self
            .send("upload", self.client.post(url).multipart(form))
            .await?;
        Self::read_json("upload", "Upload failed", response).await
    }

    async fn ingestion_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        let url = self.endpoint(&["api", "ingestion-status", job_id])?;
        let response = self.send("job status", self.client.get(url)).await?;
        Self::read_json("job status", "Job status unavailable", response).await
    }

    async fn query(&self, text: &str) -> Result<QueryResultEnvelope> {
        let url = self.endpoint(&["api", "query"])?;
        let request = self.client.post(url).json(&QueryRequest { query: text });
        let response = self.send("query", request).await?;
        let body: Value = Self::read_json("query", "Query failed", response).await?;
        Ok(QueryResultEnvelope::from_json(body))
    }

    async fn query_history(&self) -> Result<Vec<HistoryEntry>> {
        let url = self.endpoint(&["api", "query", "history"])?;
        let response = self.send("history", self.client.get(url)).await?;
        Self::read_json("history", "History unavailable", response).await
    }

    async fn metrics(&self) -> Result<MetricsResponse> {
        let url = self.endpoint(&["api", "metrics"])?;
        let response = self.send("metrics", self.client.get(url)).await?;
        Self::read_json("metrics", "Metrics unavailable", response).await
    }

    async fn schema(&self) -> Result<SchemaResponse> {
        let url = self.endpoint(&["api", "schema"])?;
        let response = self.send("schema", self.client.get(url)).await?;
        Self::read_json("schema", "Schema unavailable", response).await
    }

    async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint(&["health"])?;
        let response = self.send("health", self.client.get(url)).await?;
        Self::read_json("health", "Health check failed", response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> ConsoleError {
    if e.is_connect() {
        ConsoleError::transport(format!(
            "Failed to connect to server. Is it running? ({})",
            e
        ))
    } else {
        ConsoleError::transport(format!("Request failed: {}", e))
    }
}

/// Builds a server error from a non-success response body.
///
/// Uses the `detail` field when the body is JSON carrying one (a string, or
/// FastAPI's list of validation errors), otherwise the fallback message.
fn server_error(status: StatusCode, body: &str, fallback: &str) -> ConsoleError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .and_then(|detail| match detail {
            Value::String(s) => Some(s),
            Value::Array(items) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            Value::Null => None,
            other => Some(other.to_string()),
        });

    ConsoleError::server(
        status.as_u16(),
        detail.unwrap_or_else(|| fallback.to_string()),
    )
}
