//! Query submission and the result envelope it produces.

mod envelope;
mod submitter;

pub use envelope::{
    DocumentMatch, HybridResults, PerformanceMetrics, QueryResultEnvelope, QueryResults,
    QueryType, Row, DEFAULT_CACHE_HIT, DEFAULT_ERROR_MESSAGE, DEFAULT_RESPONSE_TIME,
};
pub use submitter::{QuerySubmitter, NETWORK_ERROR_MESSAGE};
