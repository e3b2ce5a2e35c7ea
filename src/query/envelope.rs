//! Query result envelope.
//!
//! The server tags every query response with `query_type`; the envelope
//! decodes it into an exhaustive enum so each shape only carries its own
//! payload. Decoding never fails: missing fields fall back to the named
//! defaults below and an unknown tag becomes an `Error` result.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::warn;

/// A row of a tabular result. Keys keep the server's order.
pub type Row = Map<String, Value>;

/// Fallback when `performance_metrics.response_time` is absent.
pub const DEFAULT_RESPONSE_TIME: f64 = 0.0;

/// Fallback when `performance_metrics.cache_hit` is absent.
pub const DEFAULT_CACHE_HIT: bool = false;

/// Fallback message for error envelopes that carry no message.
pub const DEFAULT_ERROR_MESSAGE: &str = "Query failed";

/// Discriminant of a result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Sql,
    Document,
    Hybrid,
    Error,
}

impl QueryType {
    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Document => "document",
            Self::Hybrid => "hybrid",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document chunk matched by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatch {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub doc_type: String,
    /// Cosine similarity in [0, 1].
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub chunk_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_type: Option<String>,
}

/// Payload of a hybrid result: both tabular and document matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridResults {
    pub sql_results: Vec<Row>,
    pub document_results: Vec<DocumentMatch>,
}

/// Type-specific payload of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResults {
    Sql(Vec<Row>),
    Document(Vec<DocumentMatch>),
    Hybrid(HybridResults),
    Error(String),
}

impl QueryResults {
    /// Returns the discriminant.
    pub fn query_type(&self) -> QueryType {
        match self {
            Self::Sql(_) => QueryType::Sql,
            Self::Document(_) => QueryType::Document,
            Self::Hybrid(_) => QueryType::Hybrid,
            Self::Error(_) => QueryType::Error,
        }
    }
}

/// Timing information attached by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Server-side response time in seconds.
    pub response_time: f64,
    pub cache_hit: bool,
    /// Server's complexity estimate ("simple", "medium", "cached", ...).
    pub query_complexity: Option<String>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            response_time: DEFAULT_RESPONSE_TIME,
            cache_hit: DEFAULT_CACHE_HIT,
            query_complexity: None,
        }
    }
}

/// An immutable query response.
///
/// The JSON body exactly as received is kept next to the decoded form so that
/// exporting reproduces it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultEnvelope {
    results: QueryResults,
    sources: Vec<String>,
    performance_metrics: PerformanceMetrics,
    sql_query: Option<String>,
    /// Server-side note attached to a non-error result (e.g. SQL generation failed).
    notice: Option<String>,
    raw: Value,
}

impl QueryResultEnvelope {
    /// Decodes a response body.
    pub fn from_json(raw: Value) -> Self {
        let obj = raw.as_object();
        let field = |name: &str| obj.and_then(|o| o.get(name));
        let string_field = |name: &str| field(name).and_then(Value::as_str).map(str::to_string);

        let query_type = string_field("query_type");
        let notice = string_field("error");
        let results_value = field("results").cloned().unwrap_or(Value::Null);

        let (results, notice) = match query_type.as_deref() {
            Some("sql") => (QueryResults::Sql(decode_rows(&results_value)), notice),
            Some("document") => (
                QueryResults::Document(decode_documents(&results_value)),
                notice,
            ),
            Some("hybrid") => {
                let part = |name: &str| results_value.get(name).cloned().unwrap_or(Value::Null);
                (
                    QueryResults::Hybrid(HybridResults {
                        sql_results: decode_rows(&part("sql_results")),
                        document_results: decode_documents(&part("document_results")),
                    }),
                    notice,
                )
            }
            Some("error") => (
                QueryResults::Error(notice.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())),
                None,
            ),
            Some(other) => {
                warn!("Unsupported query type from server: {}", other);
                (
                    QueryResults::Error(format!("Unsupported query type '{}'", other)),
                    None,
                )
            }
            None => {
                warn!("Query response has no query_type");
                (
                    QueryResults::Error("Response is missing query_type".to_string()),
                    None,
                )
            }
        };

        let sources = field("sources")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let metrics = field("performance_metrics");
        let performance_metrics = PerformanceMetrics {
            response_time: metrics
                .and_then(|m| m.get("response_time"))
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_RESPONSE_TIME),
            cache_hit: metrics
                .and_then(|m| m.get("cache_hit"))
                .and_then(Value::as_bool)
                .unwrap_or(DEFAULT_CACHE_HIT),
            query_complexity: metrics
                .and_then(|m| m.get("query_complexity"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        let sql_query = string_field("sql_query");

        Self {
            results,
            sources,
            performance_metrics,
            sql_query,
            notice,
            raw,
        }
    }

    /// Builds an error envelope produced on the client side.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let raw = json!({
            "query_type": "error",
            "results": [],
            "sources": [],
            "error": message,
            "performance_metrics": {
                "response_time": DEFAULT_RESPONSE_TIME,
                "cache_hit": DEFAULT_CACHE_HIT,
            },
        });
        Self::from_json(raw)
    }

    pub fn query_type(&self) -> QueryType {
        self.results.query_type()
    }

    pub fn results(&self) -> &QueryResults {
        &self.results
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn performance_metrics(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    pub fn sql_query(&self) -> Option<&str> {
        self.sql_query.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Returns the response body as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn is_error(&self) -> bool {
        matches!(self.results, QueryResults::Error(_))
    }

    /// Returns the error message for error envelopes.
    pub fn error_message(&self) -> Option<&str> {
        match &self.results {
            QueryResults::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl Serialize for QueryResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryResultEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

fn decode_rows(value: &Value) -> Vec<Row> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(row) => Some(row.clone()),
            other => {
                warn!("Skipping non-object row in sql results: {}", other);
                None
            }
        })
        .collect()
}

fn decode_documents(value: &Value) -> Vec<DocumentMatch> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match DocumentMatch::deserialize(item) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Skipping malformed document result: {}", e);
                None
            }
        })
        .collect()
}
