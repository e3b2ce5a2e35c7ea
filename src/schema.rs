//! Schema snapshot types.
//!
//! The server discovers the database schema on connect and ships it back as
//! JSON. Tables and columns arrive either as a name-keyed mapping or as a list
//! of objects carrying a `name` field; both decode into the same snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Discovered database schema, replaced wholesale on every (re)connect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaSnapshot {
    /// Tables keyed by name.
    #[serde(default, deserialize_with = "named_map")]
    pub tables: BTreeMap<String, TableInfo>,

    /// Explicit and inferred relationships between tables.
    #[serde(default)]
    pub relationships: Vec<Relationship>,

    /// SQL dialect reported by the server (e.g. "postgresql", "sqlite").
    #[serde(default)]
    pub database_type: Option<String>,
}

impl SchemaSnapshot {
    /// Number of tables in the snapshot.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of relationships in the snapshot.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Formats the schema for terminal display.
    pub fn format_for_display(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(|(name, table)| table.format_for_display(name))
            .collect::<Vec<_>>()
            .join("");

        let relationships_text = if self.relationships.is_empty() {
            String::new()
        } else {
            let lines = self
                .relationships
                .iter()
                .map(|r| {
                    format!(
                        "  - {}.{} -> {}.{} ({})\n",
                        r.from_table,
                        r.from_columns.join(", "),
                        r.to_table,
                        r.to_columns.join(", "),
                        r.kind.as_deref().unwrap_or("unknown")
                    )
                })
                .collect::<Vec<_>>()
                .join("");
            format!("Relationships:\n{}", lines)
        };

        format!("Database Schema:\n\n{}{}", tables_text, relationships_text)
    }
}

/// Metadata about one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableInfo {
    /// Entity classification assigned by the server (e.g. "employee").
    #[serde(default)]
    pub purpose: String,

    /// Row count; the server sends null when counting failed.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub row_count: u64,

    /// Columns keyed by name.
    #[serde(default, deserialize_with = "named_map")]
    pub columns: BTreeMap<String, ColumnInfo>,

    /// Primary key column names.
    #[serde(default)]
    pub primary_keys: Vec<String>,
}

impl TableInfo {
    fn format_for_display(&self, name: &str) -> String {
        let column_lines = self
            .columns
            .iter()
            .map(|(col_name, col)| {
                if self.primary_keys.contains(col_name) {
                    format!("  - {}: {} (PK)\n", col_name, col.data_type)
                } else {
                    format!("  - {}: {}\n", col_name, col.data_type)
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let purpose = if self.purpose.is_empty() {
            "unclassified"
        } else {
            &self.purpose
        };

        format!(
            "Table: {} [{}, {} rows]\n{}\n",
            name, purpose, self.row_count, column_lines
        )
    }
}

/// Metadata about one column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    /// Database type as rendered by the server (e.g. "VARCHAR(255)").
    #[serde(rename = "type", default)]
    pub data_type: String,

    /// Any additional attributes (nullable, default, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A relationship between two tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    #[serde(default)]
    pub from_table: String,
    #[serde(default)]
    pub from_columns: Vec<String>,
    #[serde(default)]
    pub to_table: String,
    #[serde(default)]
    pub to_columns: Vec<String>,
    /// "explicit" for foreign keys, "inferred" for naming-convention matches.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Accepts `{"name": {...}}` or `[{"name": "name", ...}]`.
fn named_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(BTreeMap<String, serde_json::Value>),
        List(Vec<serde_json::Value>),
        Null,
    }

    let entries: Vec<(String, serde_json::Value)> = match Shape::deserialize(deserializer)? {
        Shape::Map(map) => map.into_iter().collect(),
        Shape::List(list) => list
            .into_iter()
            .filter_map(|mut item| {
                let name = item
                    .as_object_mut()?
                    .remove("name")?
                    .as_str()?
                    .to_string();
                Some((name, item))
            })
            .collect(),
        Shape::Null => Vec::new(),
    };

    entries
        .into_iter()
        .map(|(name, value)| {
            serde_json::from_value(value)
                .map(|v| (name, v))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}
