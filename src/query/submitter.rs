//! Natural-language query submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::envelope::{QueryResultEnvelope, DEFAULT_ERROR_MESSAGE};
use crate::api::{HistoryEntry, ServerApi};
use crate::error::{ConsoleError, Result};

/// Message shown when the server could not be reached at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: could not reach the query server";

/// Submits queries one at a time and keeps the server's query history.
pub struct QuerySubmitter {
    api: Arc<dyn ServerApi>,
    loading: AtomicBool,
    history: RwLock<Vec<HistoryEntry>>,
}

/// Clears the loading flag when dropped, including on cancellation.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QuerySubmitter {
    pub fn new(api: Arc<dyn ServerApi>) -> Self {
        Self {
            api,
            loading: AtomicBool::new(false),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Whether a query is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Last fetched query history.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Submits a query.
    ///
    /// Blank text and a second submission while one is outstanding are
    /// rejected before any request. Every other failure comes back as an
    /// `error` envelope. The history is refreshed after each request.
    pub async fn submit(&self, text: &str) -> Result<QueryResultEnvelope> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConsoleError::validation("Please enter a query"));
        }

        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ConsoleError::validation(
                "A query is already running; wait for it to finish",
            ));
        }

        let envelope = {
            let _loading = LoadingGuard(&self.loading);
            debug!("Submitting query: {}", text);
            match self.api.query(text).await {
                Ok(envelope) => envelope,
                Err(e) => envelope_for_error(e),
            }
        };

        if let Some(message) = envelope.error_message() {
            info!("Query failed: {}", message);
        } else {
            info!(
                "Query returned {} result ({:.2}s{})",
                envelope.query_type(),
                envelope.performance_metrics().response_time,
                if envelope.performance_metrics().cache_hit {
                    ", cached"
                } else {
                    ""
                }
            );
        }

        self.refresh_history().await;
        Ok(envelope)
    }

    /// Refetches the query history. Failures are logged and keep the old list.
    pub async fn refresh_history(&self) {
        match self.api.query_history().await {
            Ok(entries) => {
                *self.history.write().unwrap_or_else(PoisonError::into_inner) = entries;
            }
            Err(e) => warn!("Failed to refresh query history: {}", e),
        }
    }
}

fn envelope_for_error(error: ConsoleError) -> QueryResultEnvelope {
    match error {
        ConsoleError::Server { message, .. } if !message.trim().is_empty() => {
            QueryResultEnvelope::error(message)
        }
        ConsoleError::Server { .. } => QueryResultEnvelope::error(DEFAULT_ERROR_MESSAGE),
        ConsoleError::Transport(detail) => {
            warn!("Query transport failure: {}", detail);
            QueryResultEnvelope::error(NETWORK_ERROR_MESSAGE)
        }
        other => QueryResultEnvelope::error(other.user_message().to_string()),
    }
}
