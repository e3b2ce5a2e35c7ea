//! Result presentation.
//!
//! [`ResultAdapter`] owns one immutable envelope plus the view state derived
//! from it (page, hybrid sub-tab). Dispatch over the four result shapes is
//! exhaustive; the envelope is never modified.

mod documents;
mod export;
mod table;

pub use documents::{
    document_rows, DocumentRow, SimilarityBucket, HIGH_SIMILARITY, MEDIUM_SIMILARITY,
};
pub use export::{to_csv, to_json};
pub use table::{cell_text, columns_of, Pager, TablePage, NULL_PLACEHOLDER, PAGE_SIZE};

use std::fmt;
use std::str::FromStr;

use crate::error::{ConsoleError, Result};
use crate::query::{QueryResultEnvelope, QueryResults, Row};

/// Sub-tab of a hybrid result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HybridTab {
    #[default]
    Sql,
    Documents,
}

impl HybridTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Documents => "documents",
        }
    }
}

impl fmt::Display for HybridTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HybridTab {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(Self::Sql),
            "documents" | "document" | "docs" => Ok(Self::Documents),
            other => Err(ConsoleError::validation(format!(
                "Unknown tab '{}'. Use 'sql' or 'documents'",
                other
            ))),
        }
    }
}

/// What to draw for the current envelope and view state.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView<'a> {
    Table(TablePage<'a>),
    Documents(Vec<DocumentRow<'a>>),
    Hybrid {
        active: HybridTab,
        content: HybridContent<'a>,
    },
    Error(&'a str),
}

/// Content of the active hybrid sub-tab.
#[derive(Debug, Clone, PartialEq)]
pub enum HybridContent<'a> {
    Table(TablePage<'a>),
    Documents(Vec<DocumentRow<'a>>),
    /// The active sub-result is empty.
    NoResults,
}

/// Drives the view of one query result.
#[derive(Debug, Clone)]
pub struct ResultAdapter {
    envelope: QueryResultEnvelope,
    pager: Pager,
    tab: HybridTab,
}

impl ResultAdapter {
    pub fn new(envelope: QueryResultEnvelope) -> Self {
        let pager = Pager::new(table_rows(&envelope).map_or(0, <[Row]>::len));
        Self {
            envelope,
            pager,
            tab: HybridTab::default(),
        }
    }

    pub fn envelope(&self) -> &QueryResultEnvelope {
        &self.envelope
    }

    /// Current 1-based page of the tabular part.
    pub fn page(&self) -> usize {
        self.pager.page()
    }

    pub fn total_pages(&self) -> usize {
        self.pager.total_pages()
    }

    /// Selects a page, clamped to the valid range. Returns the page selected.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.pager.set_page(page)
    }

    pub fn next_page(&mut self) -> usize {
        self.pager.set_page(self.pager.page() + 1)
    }

    pub fn prev_page(&mut self) -> usize {
        self.pager.set_page(self.pager.page().saturating_sub(1))
    }

    /// Active sub-tab, for hybrid results only.
    pub fn active_tab(&self) -> Option<HybridTab> {
        matches!(self.envelope.results(), QueryResults::Hybrid(_)).then_some(self.tab)
    }

    /// Switches the hybrid sub-tab. Only the view changes; nothing is fetched.
    pub fn switch_tab(&mut self, tab: HybridTab) -> Result<()> {
        match self.envelope.results() {
            QueryResults::Hybrid(_) => {
                self.tab = tab;
                Ok(())
            }
            _ => Err(ConsoleError::validation(format!(
                "Tabs are only available for hybrid results, not {}",
                self.envelope.query_type()
            ))),
        }
    }

    /// Builds the view for the current state.
    pub fn view(&self) -> ResultView<'_> {
        match self.envelope.results() {
            QueryResults::Sql(rows) => ResultView::Table(TablePage::new(rows, &self.pager)),
            QueryResults::Document(docs) => ResultView::Documents(document_rows(docs)),
            QueryResults::Hybrid(hybrid) => {
                let content = match self.tab {
                    HybridTab::Sql if hybrid.sql_results.is_empty() => HybridContent::NoResults,
                    HybridTab::Sql => {
                        HybridContent::Table(TablePage::new(&hybrid.sql_results, &self.pager))
                    }
                    HybridTab::Documents if hybrid.document_results.is_empty() => {
                        HybridContent::NoResults
                    }
                    HybridTab::Documents => {
                        HybridContent::Documents(document_rows(&hybrid.document_results))
                    }
                };
                ResultView::Hybrid {
                    active: self.tab,
                    content,
                }
            }
            QueryResults::Error(message) => ResultView::Error(message.as_str()),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        to_json(&self.envelope)
    }

    pub fn export_csv(&self) -> Result<String> {
        to_csv(&self.envelope)
    }
}

fn table_rows(envelope: &QueryResultEnvelope) -> Option<&[Row]> {
    match envelope.results() {
        QueryResults::Sql(rows) => Some(rows.as_slice()),
        QueryResults::Hybrid(hybrid) => Some(hybrid.sql_results.as_slice()),
        QueryResults::Document(_) | QueryResults::Error(_) => None,
    }
}
