//! Session flows against the mock server.
//!
//! Time is paused so the 2 s job interval and the 10 s metrics interval
//! advance instantly.

use std::sync::Arc;
use std::time::Duration;

use nlq_console::api::{
    ConnectResponse, MetricsResponse, MockServerApi, StatusStep, UploadFile,
};
use nlq_console::config::PollingConfig;
use nlq_console::error::ConsoleError;
use nlq_console::jobs::{JobEvent, JobStatus};
use nlq_console::query::{QueryResultEnvelope, QueryType};
use nlq_console::results::{HybridContent, HybridTab, ResultView};
use nlq_console::session::Session;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

const JOB_TICK: Duration = Duration::from_millis(2000);

fn session() -> (Arc<MockServerApi>, Session) {
    let api = Arc::new(MockServerApi::new());
    let session = Session::new(api.clone(), &PollingConfig::default());
    (api, session)
}

async fn advance(d: Duration) {
    tokio::time::sleep(d).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn files(names: &[&str]) -> Vec<UploadFile> {
    names.iter().map(|n| UploadFile::new(*n, "content")).collect()
}

#[tokio::test(start_paused = true)]
async fn test_upload_progresses_to_completion() {
    let (api, session) = session();
    session.start();
    let mut events = session.subscribe_jobs();

    let id = assert_ok!(session.upload(files(&["a.pdf", "b.docx", "c.txt"])).await);
    assert_eq!(
        session.tracker().job(&id).unwrap().status(),
        JobStatus::Queued
    );

    api.push_status(id.as_str(), StatusStep::status("processing", 1, 0, 3));
    api.push_status(id.as_str(), StatusStep::status("processing", 2, 0, 3));
    api.push_status(id.as_str(), StatusStep::status("completed", 2, 1, 3));

    let job = assert_ok!(session.wait_for_job(&id).await);
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.processed_files() + job.failed_files(), 3);

    let mut observed = Vec::new();
    while let Ok(event) = events.try_recv() {
        observed.push(event);
    }
    assert_eq!(observed.len(), 3);
    assert!(matches!(observed.last(), Some(JobEvent::Completed(_))));

    // No requests after the terminal status.
    let polls = api.status_calls(id.as_str());
    advance(JOB_TICK * 10).await;
    assert_eq!(api.status_calls(id.as_str()), polls);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_two_batches_are_tracked_independently() {
    let (api, session) = session();
    session.start();

    let first = assert_ok!(session.upload(files(&["a.pdf"])).await);
    let second = assert_ok!(session.upload(files(&["b.pdf", "c.pdf"])).await);
    assert_ne!(first, second);

    api.push_status(first.as_str(), StatusStep::status("failed", 0, 1, 1));
    api.push_status(second.as_str(), StatusStep::status("processing", 1, 0, 2));
    api.push_status(second.as_str(), StatusStep::status("processing", 1, 0, 2));
    api.push_status(second.as_str(), StatusStep::status("completed", 2, 0, 2));

    advance(JOB_TICK).await;
    assert_eq!(
        session.tracker().job(&first).unwrap().status(),
        JobStatus::Failed
    );
    assert!(session.tracker().is_polling(&second));

    let done = assert_ok!(session.wait_for_job(&second).await);
    assert_eq!(done.status(), JobStatus::Completed);
    assert_eq!(api.status_calls(first.as_str()), 1);

    let order: Vec<String> = session
        .tracker()
        .jobs()
        .iter()
        .map(|j| j.id().to_string())
        .collect();
    assert_eq!(order, vec![first.to_string(), second.to_string()]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_upload_is_rejected_locally() {
    let (api, session) = session();
    let err = assert_err!(session.upload(Vec::new()).await);
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert_eq!(api.calls("upload"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_polling() {
    let (api, session) = session();
    session.start();
    let id = assert_ok!(session.upload(files(&["a.pdf"])).await);
    api.push_status(id.as_str(), StatusStep::status("processing", 0, 0, 1));

    advance(JOB_TICK).await;
    assert_eq!(api.status_calls(id.as_str()), 1);

    session.shutdown().await;
    let metrics_calls = api.calls("metrics");
    advance(JOB_TICK * 20).await;
    assert_eq!(api.status_calls(id.as_str()), 1);
    assert_eq!(api.calls("metrics"), metrics_calls);
    assert!(!session.tracker().is_polling(&id));
}

#[tokio::test(start_paused = true)]
async fn test_metrics_snapshot_replaced_each_tick() {
    let (api, session) = session();
    api.push_metrics(Ok(MetricsResponse {
        database_connected: Some(false),
        documents_indexed: Some(0),
        ..Default::default()
    }));
    api.push_metrics(Ok(MetricsResponse {
        database_connected: Some(true),
        documents_indexed: Some(12),
        cache_hit_rate: Some(0.4),
        active_jobs: Some(1),
        cache_size: Some(3),
    }));

    session.start();
    advance(Duration::ZERO).await;
    let first = session.metrics().snapshot().unwrap();
    assert!(!first.database_connected);

    advance(Duration::from_secs(10)).await;
    let second = session.metrics().snapshot().unwrap();
    assert!(second.database_connected);
    assert_eq!(second.documents_indexed, 12);
    assert_eq!(second.active_jobs, 1);

    session.shutdown().await;
}

#[tokio::test]
async fn test_blank_query_never_sets_loading() {
    let (api, session) = session();
    let err = assert_err!(session.query("   ").await);
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(!session.submitter().is_loading());
    assert_eq!(api.calls("query"), 0);
}

#[tokio::test]
async fn test_hybrid_tab_switch_makes_no_request() {
    let (api, session) = session();
    api.push_query(Ok(QueryResultEnvelope::from_json(json!({
        "query_type": "hybrid",
        "results": {
            "sql_results": [],
            "document_results": [
                {"filename": "handbook.pdf", "doc_type": "pdf", "similarity_score": 0.66, "chunk_text": "Benefits"}
            ]
        },
        "sources": ["database", "documents"],
        "performance_metrics": {"response_time": 1.2, "cache_hit": false},
    }))));

    let mut adapter = assert_ok!(session.query("employees and their benefits").await);
    assert_eq!(adapter.envelope().query_type(), QueryType::Hybrid);
    assert_eq!(
        adapter.view(),
        ResultView::Hybrid {
            active: HybridTab::Sql,
            content: HybridContent::NoResults,
        }
    );

    let queries = api.calls("query");
    assert_ok!(adapter.switch_tab(HybridTab::Documents));
    match adapter.view() {
        ResultView::Hybrid {
            content: HybridContent::Documents(rows),
            ..
        } => assert_eq!(rows[0].document.filename, "handbook.pdf"),
        other => panic!("Expected document rows, got {:?}", other),
    }
    assert_eq!(api.calls("query"), queries);
}

#[tokio::test]
async fn test_server_error_surfaces_as_error_envelope() {
    let (api, session) = session();
    api.push_query(Err(ConsoleError::server(400, "Database not connected")));

    let adapter = assert_ok!(session.query("list tables").await);
    assert_eq!(adapter.view(), ResultView::Error("Database not connected"));
    assert_err!(adapter.export_csv());
    assert_eq!(api.calls("history"), 1);
}

#[tokio::test]
async fn test_connect_then_reconnect_replaces_schema() {
    let (api, session) = session();
    api.set_connect(Ok(serde_json::from_value::<ConnectResponse>(json!({
        "status": "success",
        "message": "Connected",
        "schema": {
            "tables": [
                {"name": "employees", "purpose": "employee", "row_count": 10,
                 "columns": [{"name": "id", "type": "INTEGER", "nullable": false}],
                 "primary_keys": ["id"]},
                {"name": "departments", "purpose": "department", "row_count": null,
                 "columns": [{"name": "id", "type": "INTEGER"}]}
            ],
            "relationships": [
                {"from_table": "employees", "from_columns": ["dept_id"],
                 "to_table": "departments", "to_columns": ["id"], "type": "explicit"}
            ]
        },
        "tables_count": 2,
        "relationships_count": 1
    }))
    .unwrap()));

    let summary = assert_ok!(session.connect("postgresql://hr:secret@db:5432/hr").await);
    assert_eq!(summary.tables_count, 2);
    assert_eq!(summary.schema.tables["departments"].row_count, 0);

    api.set_connect(Ok(ConnectResponse::default()));
    let summary = assert_ok!(session.connect("sqlite:///empty.db").await);
    assert_eq!(summary.tables_count, 0);
    assert_eq!(session.gateway().schema().unwrap().table_count(), 0);
}
