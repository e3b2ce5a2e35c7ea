//! Mock server API for testing.
//!
//! Scripted, in-memory stand-in for the query server. Responses are queued
//! per endpoint and every call is counted so tests can assert on request
//! traffic (e.g. that a finished job is no longer polled).

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::types::{
    ConnectResponse, HealthResponse, HistoryEntry, JobStatusResponse, MetricsResponse,
    SchemaResponse, UploadFile, UploadResponse,
};
use super::ServerApi;
use crate::error::{ConsoleError, Result};
use crate::query::QueryResultEnvelope;

/// One scripted reply to a job status poll.
#[derive(Debug, Clone)]
pub enum StatusStep {
    /// Reply with this result.
    Respond(Result<JobStatusResponse>),
    /// Never reply.
    Hang,
}

impl StatusStep {
    /// Shorthand for a successful status reply.
    pub fn status(status: &str, processed: u64, failed: u64, total: u64) -> Self {
        Self::Respond(Ok(JobStatusResponse {
            status: Some(status.to_string()),
            processed_files: Some(processed),
            failed_files: Some(failed),
            total_files: Some(total),
            ..Default::default()
        }))
    }
}

#[derive(Default)]
struct MockState {
    connect: Option<Result<ConnectResponse>>,
    uploads: VecDeque<Result<UploadResponse>>,
    uploaded_batches: Vec<Vec<String>>,
    next_job: u64,
    statuses: HashMap<String, VecDeque<StatusStep>>,
    last_status: HashMap<String, JobStatusResponse>,
    status_calls: HashMap<String, usize>,
    queries: VecDeque<Result<QueryResultEnvelope>>,
    query_texts: Vec<String>,
    query_delay: Duration,
    history: Option<Result<Vec<HistoryEntry>>>,
    metrics: VecDeque<(Duration, Result<MetricsResponse>)>,
    schema: Option<Result<SchemaResponse>>,
    health: Option<Result<HealthResponse>>,
    calls: HashMap<&'static str, usize>,
}

/// A mock server that returns scripted responses.
#[derive(Default)]
pub struct MockServerApi {
    state: Mutex<MockState>,
}

impl MockServerApi {
    /// Creates a mock with default replies on every endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, endpoint: &'static str) {
        *self.state().calls.entry(endpoint).or_default() += 1;
    }

    /// Sets the reply to connect requests.
    pub fn set_connect(&self, result: Result<ConnectResponse>) {
        self.state().connect = Some(result);
    }

    /// Queues a reply to the next upload request.
    pub fn push_upload(&self, result: Result<UploadResponse>) {
        self.state().uploads.push_back(result);
    }

    /// Queues a reply to the next status poll of `job_id`.
    ///
    /// Once the queue is drained the last successful reply is repeated.
    pub fn push_status(&self, job_id: &str, step: StatusStep) {
        self.state()
            .statuses
            .entry(job_id.to_string())
            .or_default()
            .push_back(step);
    }

    /// Queues a reply to the next query.
    pub fn push_query(&self, result: Result<QueryResultEnvelope>) {
        self.state().queries.push_back(result);
    }

    /// Delays every query reply.
    pub fn set_query_delay(&self, delay: Duration) {
        self.state().query_delay = delay;
    }

    /// Sets the reply to history requests.
    pub fn set_history(&self, result: Result<Vec<HistoryEntry>>) {
        self.state().history = Some(result);
    }

    /// Queues a reply to the next metrics request.
    pub fn push_metrics(&self, result: Result<MetricsResponse>) {
        self.push_metrics_delayed(Duration::ZERO, result);
    }

    /// Queues a reply to the next metrics request, delivered after `delay`.
    pub fn push_metrics_delayed(&self, delay: Duration, result: Result<MetricsResponse>) {
        self.state().metrics.push_back((delay, result));
    }

    /// Sets the reply to schema requests.
    pub fn set_schema(&self, result: Result<SchemaResponse>) {
        self.state().schema = Some(result);
    }

    /// Sets the reply to health requests.
    pub fn set_health(&self, result: Result<HealthResponse>) {
        self.state().health = Some(result);
    }

    /// Number of requests made to an endpoint
    /// ("connect", "upload", "status", "query", "history", "metrics", "schema", "health").
    pub fn calls(&self, endpoint: &str) -> usize {
        self.state().calls.get(endpoint).copied().unwrap_or(0)
    }

    /// Number of status polls made for one job.
    pub fn status_calls(&self, job_id: &str) -> usize {
        self.state().status_calls.get(job_id).copied().unwrap_or(0)
    }

    /// Query texts received, in order.
    pub fn query_texts(&self) -> Vec<String> {
        self.state().query_texts.clone()
    }

    /// File names of every uploaded batch, in order.
    pub fn uploaded_batches(&self) -> Vec<Vec<String>> {
        self.state().uploaded_batches.clone()
    }
}

#[async_trait]
impl ServerApi for MockServerApi {
    async fn connect_database(&self, _connection_string: &str) -> Result<ConnectResponse> {
        self.record("connect");
        self.state()
            .connect
            .clone()
            .unwrap_or_else(|| Ok(ConnectResponse::default()))
    }

    async fn upload_documents(&self, files: Vec<UploadFile>) -> Result<UploadResponse> {
        self.record("upload");
        let mut state = self.state();
        state
            .uploaded_batches
            .push(files.iter().map(|f| f.name.clone()).collect());

        if let Some(scripted) = state.uploads.pop_front() {
            return scripted;
        }

        state.next_job += 1;
        Ok(UploadResponse {
            job_id: Some(format!("job-{}", state.next_job)),
            status: Some("started".to_string()),
            total_files: Some(files.len() as u64),
            message: None,
        })
    }

    async fn ingestion_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        self.record("status");
        let step = {
            let mut state = self.state();
            *state.status_calls.entry(job_id.to_string()).or_default() += 1;
            let scripted = state
                .statuses
                .get_mut(job_id)
                .and_then(|steps| steps.pop_front());
            match scripted {
                Some(step) => step,
                None => StatusStep::Respond(
                    state
                        .last_status
                        .get(job_id)
                        .cloned()
                        .ok_or_else(|| ConsoleError::server(404, "Job not found")),
                ),
            }
        };

        match step {
            StatusStep::Respond(result) => {
                if let Ok(status) = &result {
                    self.state()
                        .last_status
                        .insert(job_id.to_string(), status.clone());
                }
                result
            }
            StatusStep::Hang => std::future::pending().await,
        }
    }

    async fn query(&self, text: &str) -> Result<QueryResultEnvelope> {
        self.record("query");
        let (result, delay) = {
            let mut state = self.state();
            state.query_texts.push(text.to_string());
            let result = state.queries.pop_front().unwrap_or_else(|| {
                Ok(QueryResultEnvelope::from_json(serde_json::json!({
                    "query_type": "sql",
                    "results": [],
                    "sources": ["database"],
                })))
            });
            (result, state.query_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn query_history(&self) -> Result<Vec<HistoryEntry>> {
        self.record("history");
        self.state().history.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn metrics(&self) -> Result<MetricsResponse> {
        self.record("metrics");
        let (delay, result) = self
            .state()
            .metrics
            .pop_front()
            .unwrap_or_else(|| (Duration::ZERO, Ok(MetricsResponse::default())));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn schema(&self) -> Result<SchemaResponse> {
        self.record("schema");
        self.state()
            .schema
            .clone()
            .unwrap_or_else(|| Err(ConsoleError::server(400, "Database not connected")))
    }

    async fn health(&self) -> Result<HealthResponse> {
        self.record("health");
        self.state().health.clone().unwrap_or_else(|| {
            Ok(HealthResponse {
                status: Some("healthy".to_string()),
                ..Default::default()
            })
        })
    }
}
