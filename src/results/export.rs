//! JSON and CSV export of result envelopes.

use serde_json::Value;

use super::table::columns_of;
use crate::error::{ConsoleError, Result};
use crate::query::{QueryResultEnvelope, QueryResults, Row};

/// Pretty-printed JSON of the envelope exactly as received.
pub fn to_json(envelope: &QueryResultEnvelope) -> Result<String> {
    serde_json::to_string_pretty(envelope.raw())
        .map_err(|e| ConsoleError::internal(format!("Failed to serialize result: {}", e)))
}

/// CSV of a `sql` result.
///
/// The header is the first row's keys. String fields are written as JSON
/// string literals so commas, quotes and newlines stay inside the field;
/// numbers and booleans are written bare, null and missing values as empty
/// fields. Rows are joined with `\n`. No rows gives an empty string.
pub fn to_csv(envelope: &QueryResultEnvelope) -> Result<String> {
    let rows = match envelope.results() {
        QueryResults::Sql(rows) => rows,
        _ => {
            return Err(ConsoleError::validation(format!(
                "CSV export is only available for sql results, not {}",
                envelope.query_type()
            )))
        }
    };

    let columns = columns_of(rows);
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| header_field(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(csv_row(row, &columns)?);
    }
    Ok(lines.join("\n"))
}

fn csv_row(row: &Row, columns: &[&str]) -> Result<String> {
    let fields = columns
        .iter()
        .map(|col| csv_field(row.get(*col)))
        .collect::<Result<Vec<_>>>()?;
    Ok(fields.join(","))
}

fn csv_field(value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::String(s)) => quote(s),
        // Nested values are flattened to their JSON text, then quoted.
        Some(other) => quote(&other.to_string()),
    }
}

fn header_field(name: &str) -> String {
    if name.contains([',', '"', '\n', '\r']) {
        quote(name).unwrap_or_else(|_| name.to_string())
    } else {
        name.to_string()
    }
}

fn quote(s: &str) -> Result<String> {
    serde_json::to_string(s)
        .map_err(|e| ConsoleError::internal(format!("Failed to escape CSV field: {}", e)))
}
