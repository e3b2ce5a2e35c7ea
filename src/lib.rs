//! nlq-console - async client for a natural-language query server.
//!
//! Tracks server-side document ingestion jobs by polling, submits
//! natural-language queries and turns their result envelopes into paginated,
//! exportable views. The library exposes every component for the `nlq`
//! binary and for integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod render;
pub mod results;
pub mod schema;
pub mod session;
