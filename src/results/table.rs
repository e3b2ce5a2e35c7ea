//! Paginated view over tabular results.

use serde_json::Value;

use crate::query::Row;

/// Rows per page.
pub const PAGE_SIZE: usize = 50;

/// Text shown for a missing or null cell.
pub const NULL_PLACEHOLDER: &str = "-";

/// 1-based page cursor over a fixed number of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    total_rows: usize,
}

impl Pager {
    pub fn new(total_rows: usize) -> Self {
        Self {
            page: 1,
            total_rows,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Number of pages; an empty result still has one (empty) page.
    pub fn total_pages(&self) -> usize {
        self.total_rows.div_ceil(PAGE_SIZE).max(1)
    }

    /// Moves to `page`, clamped to `[1, total_pages]`. Returns the page selected.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.page = page.clamp(1, self.total_pages());
        self.page
    }

    /// Index range of the current page's rows.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = ((self.page - 1) * PAGE_SIZE).min(self.total_rows);
        let end = (start + PAGE_SIZE).min(self.total_rows);
        start..end
    }
}

/// One page of a tabular result, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage<'a> {
    /// Keys of the first row of the whole result, in server order.
    pub columns: Vec<&'a str>,
    pub rows: &'a [Row],
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

impl<'a> TablePage<'a> {
    pub fn new(all_rows: &'a [Row], pager: &Pager) -> Self {
        Self {
            columns: columns_of(all_rows),
            rows: &all_rows[pager.range()],
            page: pager.page(),
            total_pages: pager.total_pages(),
            total_rows: pager.total_rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Display text of every cell on the page, aligned to `columns`.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().map(|col| cell_text(row, col)).collect())
            .collect()
    }
}

/// Column names taken from the first row. No rows, no columns.
pub fn columns_of(rows: &[Row]) -> Vec<&str> {
    rows.first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Display text of one cell.
pub fn cell_text(row: &Row, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => NULL_PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
