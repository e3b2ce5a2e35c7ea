//! Result adapter tests over realistic server payloads.

use nlq_console::query::{QueryResultEnvelope, QueryResults, QueryType};
use nlq_console::render::render_result;
use nlq_console::results::{ResultAdapter, ResultView, SimilarityBucket, PAGE_SIZE};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn employees(n: usize) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| {
                json!({
                    "id": i,
                    "name": format!("Employee {}", i),
                    "department": if i % 2 == 0 { Value::Null } else { json!("Engineering") },
                    "salary": 50000 + i * 10,
                })
            })
            .collect(),
    )
}

#[test]
fn test_large_sql_result_pages() {
    let mut adapter = ResultAdapter::new(QueryResultEnvelope::from_json(json!({
        "query_type": "sql",
        "results": employees(120),
        "sources": ["database"],
        "sql_query": "SELECT * FROM employees",
        "performance_metrics": {"response_time": 0.12, "cache_hit": true, "query_complexity": "simple"},
    })));

    assert_eq!(adapter.total_pages(), 3);
    for (requested, expected_page, expected_rows) in
        [(0, 1, PAGE_SIZE), (2, 2, PAGE_SIZE), (3, 3, 20), (4, 3, 20), (usize::MAX, 3, 20)]
    {
        assert_eq!(adapter.set_page(requested), expected_page);
        match adapter.view() {
            ResultView::Table(page) => assert_eq!(page.rows.len(), expected_rows),
            other => panic!("Expected table, got {:?}", other),
        }
    }

    let text = render_result(&adapter);
    assert!(text.contains("Page 3 of 3 (120 rows)"));
    assert!(text.contains("complexity: simple"));
    assert!(text.contains("cache: hit"));
}

#[test]
fn test_document_ranking_kept_as_sent() {
    let envelope = QueryResultEnvelope::from_json(json!({
        "query_type": "document",
        "results": [
            {"filename": "resume_a.pdf", "doc_type": "pdf", "similarity_score": 0.55, "chunk_text": "Python"},
            {"filename": "resume_b.pdf", "doc_type": "pdf", "similarity_score": 0.72, "chunk_text": "Rust"},
            {"filename": "notes.txt", "doc_type": "txt", "similarity_score": 0.30, "chunk_text": "misc",
             "chunk_type": "skills"}
        ],
        "sources": ["documents"],
    }));
    let adapter = ResultAdapter::new(envelope);

    match adapter.view() {
        ResultView::Documents(rows) => {
            let summary: Vec<(&str, SimilarityBucket)> = rows
                .iter()
                .map(|r| (r.document.filename.as_str(), r.bucket))
                .collect();
            assert_eq!(
                summary,
                vec![
                    ("resume_a.pdf", SimilarityBucket::Medium),
                    ("resume_b.pdf", SimilarityBucket::High),
                    ("notes.txt", SimilarityBucket::Low),
                ]
            );
        }
        other => panic!("Expected documents, got {:?}", other),
    }
}

#[test]
fn test_csv_export_of_sql_rows() {
    let adapter = ResultAdapter::new(QueryResultEnvelope::from_json(json!({
        "query_type": "sql",
        "results": [{"a": 1, "b": "x,y"}],
    })));
    let csv = adapter.export_csv().unwrap();

    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("a,b"));
    assert_eq!(lines.next(), Some("1,\"x,y\""));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_json_export_round_trips_unknown_fields() {
    let raw = json!({
        "query_type": "sql",
        "results": [{"n": 1}],
        "sources": ["database"],
        "sql_query": "SELECT 1 AS n",
        "performance_metrics": {"response_time": 0.01, "cache_hit": false},
        "error": null,
        "server_version": "2.1",
    });
    let adapter = ResultAdapter::new(QueryResultEnvelope::from_json(raw.clone()));
    let exported: Value = serde_json::from_str(&adapter.export_json().unwrap()).unwrap();
    assert_eq!(exported, raw);
}

#[test]
fn test_unknown_query_type_becomes_error_view() {
    let envelope = QueryResultEnvelope::from_json(json!({
        "query_type": "graph",
        "results": {"nodes": []},
    }));
    assert_eq!(envelope.query_type(), QueryType::Error);
    assert!(matches!(envelope.results(), QueryResults::Error(msg) if msg.contains("graph")));

    let adapter = ResultAdapter::new(envelope);
    assert!(render_result(&adapter).starts_with("Error: "));
}

#[test]
fn test_missing_fields_use_defaults() {
    let envelope = QueryResultEnvelope::from_json(json!({
        "query_type": "sql",
        "results": null,
    }));
    assert_eq!(envelope.results(), &QueryResults::Sql(Vec::new()));
    assert!(envelope.sources().is_empty());
    assert_eq!(envelope.performance_metrics().response_time, 0.0);
    assert!(!envelope.performance_metrics().cache_hit);
    assert_eq!(envelope.sql_query(), None);

    let adapter = ResultAdapter::new(envelope);
    assert_eq!(adapter.total_pages(), 1);
    assert_eq!(adapter.export_csv().unwrap(), "");
}
