//! Database connection gateway.
//!
//! Sends connection requests to the server and holds the schema snapshot of
//! the last successful connection. A reconnect replaces the snapshot whole.

use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{HealthResponse, ServerApi};
use crate::error::{ConsoleError, Result};
use crate::schema::SchemaSnapshot;

/// Result of a successful connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSummary {
    pub schema: SchemaSnapshot,
    pub tables_count: u64,
    pub relationships_count: u64,
    /// Server's status message, if any.
    pub message: Option<String>,
}

impl ConnectionSummary {
    fn new(
        schema: SchemaSnapshot,
        tables_count: Option<u64>,
        relationships_count: Option<u64>,
        message: Option<String>,
    ) -> Self {
        Self {
            tables_count: tables_count.unwrap_or(schema.table_count() as u64),
            relationships_count: relationships_count
                .unwrap_or(schema.relationship_count() as u64),
            schema,
            message,
        }
    }
}

/// Connects the server to databases and keeps the discovered schema.
pub struct ConnectionGateway {
    api: Arc<dyn ServerApi>,
    current: RwLock<Option<ConnectionSummary>>,
}

impl ConnectionGateway {
    pub fn new(api: Arc<dyn ServerApi>) -> Self {
        Self {
            api,
            current: RwLock::new(None),
        }
    }

    /// Asks the server to connect to `connection_string`.
    ///
    /// Blank or unparsable strings are rejected without a request. On
    /// failure the previous snapshot is kept.
    pub async fn connect(&self, connection_string: &str) -> Result<ConnectionSummary> {
        let connection_string = connection_string.trim();
        if connection_string.is_empty() {
            return Err(ConsoleError::validation("Please enter a connection string"));
        }
        let redacted = redact_connection_string(connection_string)?;

        debug!("Connecting to {}", redacted);
        let response = self.api.connect_database(connection_string).await?;

        let schema = response.schema.unwrap_or_else(|| {
            warn!("Connect response for {} carried no schema", redacted);
            SchemaSnapshot::default()
        });
        let summary = ConnectionSummary::new(
            schema,
            response.tables_count,
            response.relationships_count,
            response.message,
        );

        info!(
            "Connected to {} ({} tables, {} relationships)",
            redacted, summary.tables_count, summary.relationships_count
        );
        self.store(summary.clone());
        Ok(summary)
    }

    /// Refetches the schema of the current connection and replaces the snapshot.
    pub async fn refresh_schema(&self) -> Result<ConnectionSummary> {
        let response = self.api.schema().await?;
        let schema = response
            .schema
            .ok_or_else(|| ConsoleError::malformed("Schema response carried no schema"))?;
        let stats = response.stats.unwrap_or_default();
        let summary = ConnectionSummary::new(schema, stats.tables, stats.relationships, None);

        debug!("Schema refreshed: {} tables", summary.tables_count);
        self.store(summary.clone());
        Ok(summary)
    }

    /// Probes server health.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.api.health().await
    }

    /// Latest schema snapshot, if connected.
    pub fn schema(&self) -> Option<SchemaSnapshot> {
        self.read().as_ref().map(|s| s.schema.clone())
    }

    /// Latest connection summary, if connected.
    pub fn summary(&self) -> Option<ConnectionSummary> {
        self.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.read().is_some()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<ConnectionSummary>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, summary: ConnectionSummary) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(summary);
    }
}

/// Parses a connection string and returns it with any password masked.
pub fn redact_connection_string(connection_string: &str) -> Result<String> {
    let mut url = Url::parse(connection_string).map_err(|e| {
        ConsoleError::validation(format!(
            "Invalid connection string (expected scheme://...): {}",
            e
        ))
    })?;
    if url.password().is_some() {
        // Only fails for cannot-be-a-base URLs, which have no password.
        let _ = url.set_password(Some("****"));
    }
    Ok(url.to_string())
}
