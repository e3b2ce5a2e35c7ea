//! Plain-text rendering of results, jobs, metrics and history.
//!
//! Tables get auto-sized columns with box-drawing borders; everything else is
//! rendered as simple lines.

use crate::api::HistoryEntry;
use crate::jobs::UploadJob;
use crate::metrics::MetricsSnapshot;
use crate::query::QueryResultEnvelope;
use crate::results::{
    DocumentRow, HybridContent, HybridTab, ResultAdapter, ResultView, TablePage,
};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Characters of chunk text shown per document match.
const CHUNK_PREVIEW_CHARS: usize = 200;

/// Placeholder for an empty result or sub-tab.
pub const NO_RESULTS: &str = "No results";

/// Renders the adapter's current view, followed by a metadata footer.
pub fn render_result(adapter: &ResultAdapter) -> String {
    let mut lines = match adapter.view() {
        ResultView::Table(page) => render_table(&page),
        ResultView::Documents(rows) => render_documents(&rows),
        ResultView::Hybrid { active, content } => {
            let mut lines = vec![format!(
                "[{}] sql  [{}] documents",
                if active == HybridTab::Sql { "x" } else { " " },
                if active == HybridTab::Documents { "x" } else { " " },
            )];
            lines.extend(match content {
                HybridContent::Table(page) => render_table(&page),
                HybridContent::Documents(rows) => render_documents(&rows),
                HybridContent::NoResults => vec![NO_RESULTS.to_string()],
            });
            lines
        }
        ResultView::Error(message) => vec![format!("Error: {}", message)],
    };

    lines.extend(render_footer(adapter.envelope()));
    lines.join("\n")
}

fn render_footer(envelope: &QueryResultEnvelope) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(notice) = envelope.notice() {
        lines.push(format!("Note: {}", notice));
    }
    if let Some(sql) = envelope.sql_query() {
        lines.push(format!("SQL: {}", sql));
    }

    let metrics = envelope.performance_metrics();
    let mut meta = format!(
        "type: {} | time: {:.3}s | cache: {}",
        envelope.query_type(),
        metrics.response_time,
        if metrics.cache_hit { "hit" } else { "miss" }
    );
    if let Some(complexity) = &metrics.query_complexity {
        meta.push_str(&format!(" | complexity: {}", complexity));
    }
    if !envelope.sources().is_empty() {
        meta.push_str(&format!(" | sources: {}", envelope.sources().join(", ")));
    }
    lines.push(meta);
    lines
}

/// Renders one table page with borders and a page footer.
pub fn render_table(page: &TablePage<'_>) -> Vec<String> {
    if page.is_empty() {
        return vec![NO_RESULTS.to_string()];
    }

    let cells = page.cells();
    let widths = calculate_column_widths(&page.columns, &cells);

    let mut lines = Vec::with_capacity(cells.len() + 5);
    lines.push(render_border(&widths, '┌', '┬', '┐'));
    lines.push(render_row(
        page.columns.iter().map(|c| c.to_string()),
        &widths,
    ));
    lines.push(render_border(&widths, '├', '┼', '┤'));
    for row in cells {
        lines.push(render_row(row.into_iter(), &widths));
    }
    lines.push(render_border(&widths, '└', '┴', '┘'));

    lines.push(format!(
        "Page {} of {} ({} row{})",
        page.page,
        page.total_pages,
        page.total_rows,
        if page.total_rows == 1 { "" } else { "s" }
    ));
    lines
}

/// Renders document matches in server order with their bucket.
pub fn render_documents(rows: &[DocumentRow<'_>]) -> Vec<String> {
    if rows.is_empty() {
        return vec![NO_RESULTS.to_string()];
    }

    let mut lines = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let doc = row.document;
        let mut title = format!("{}. {} ({})", i + 1, doc.filename, doc.doc_type);
        if let Some(chunk_type) = &doc.chunk_type {
            title.push_str(&format!(" [{}]", chunk_type));
        }
        lines.push(format!(
            "{}  {:.1}% {}",
            title,
            doc.similarity_score * 100.0,
            row.bucket
        ));
        lines.push(format!("   {}", preview(&doc.chunk_text, CHUNK_PREVIEW_CHARS)));
    }
    lines
}

/// One line per job.
pub fn render_jobs(jobs: &[UploadJob]) -> String {
    if jobs.is_empty() {
        return "No upload jobs".to_string();
    }
    let mut lines = Vec::new();
    for job in jobs {
        lines.push(job.summary());
        for outcome in job.file_results() {
            let mut line = format!(
                "  - {}: {}",
                outcome.filename,
                outcome.status.as_deref().unwrap_or("unknown")
            );
            if let Some(chunks) = outcome.chunks {
                line.push_str(&format!(" ({} chunks)", chunks));
            }
            if let Some(error) = &outcome.error {
                line.push_str(&format!(" - {}", error));
            }
            lines.push(line);
        }
        if let Some(error) = job.error() {
            lines.push(format!("  error: {}", error));
        }
    }
    lines.join("\n")
}

pub fn render_metrics(metrics: &MetricsSnapshot) -> String {
    [
        format!(
            "Database: {}",
            if metrics.database_connected {
                "connected"
            } else {
                "disconnected"
            }
        ),
        format!("Documents indexed: {}", metrics.documents_indexed),
        format!(
            "Cache hit rate: {:.1}% ({} cached queries)",
            metrics.cache_hit_rate * 100.0,
            metrics.cache_size
        ),
        format!("Active jobs: {}", metrics.active_jobs),
    ]
    .join("\n")
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No queries yet".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let mut line = format!("{:>7.3}s ", entry.processing_time);
            line.push_str(if entry.cached { "[cached] " } else { "         " });
            if let Some(kind) = &entry.query_type {
                line.push_str(&format!("[{}] ", kind));
            }
            line.push_str(&entry.query);
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Calculates the display width of each column.
fn calculate_column_widths(columns: &[&str], cells: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| c.chars().count().max(MIN_COLUMN_WIDTH))
        .collect();

    for row in cells {
        for (i, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(value.chars().count());
            }
        }
    }

    widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
}

/// Truncates a string to `max_width` characters, adding an ellipsis if needed.
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{}...", kept)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, max_chars)
}

fn render_border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let mut border = String::new();
    border.push(left);
    for (i, &width) in widths.iter().enumerate() {
        border.push_str(&"─".repeat(width + 2));
        if i < widths.len() - 1 {
            border.push(mid);
        }
    }
    border.push(right);
    border
}

fn render_row(values: impl Iterator<Item = String>, widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (value, &width) in values.zip(widths) {
        let text = truncate(&value.replace('\n', " "), width);
        let pad = width - text.chars().count();
        line.push(' ');
        line.push_str(&text);
        line.push_str(&" ".repeat(pad));
        line.push_str(" │");
    }
    line
}
