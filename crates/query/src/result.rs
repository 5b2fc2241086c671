//! Tabular results returned by [`QueryBackend::execute`](crate::QueryBackend::execute)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows of JSON cells under named, typed columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,

    /// One entry per row, cells in column order
    pub rows: Vec<Vec<Value>>,

    /// Wall time spent on the request
    pub elapsed_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            elapsed_ms: 0,
        }
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cell at `row` under column `name`
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)
    }
}

/// Result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Column {
    /// Non-nullable column
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Column from a ClickHouse type name such as `Nullable(UInt64)`
    pub fn from_clickhouse(name: impl Into<String>, type_name: &str) -> Self {
        let mut inner = type_name.trim();
        let mut nullable = false;
        loop {
            if let Some(rest) = unwrap_type(inner, "Nullable") {
                nullable = true;
                inner = rest;
            } else if let Some(rest) = unwrap_type(inner, "LowCardinality") {
                inner = rest;
            } else {
                break;
            }
        }

        Self {
            name: name.into(),
            kind: ColumnKind::from_clickhouse(inner),
            nullable,
        }
    }
}

/// `Wrapper(Inner)` -> `Inner`
fn unwrap_type<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(wrapper)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Broad value kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Date,
    DateTime,
    Boolean,
    Other,
}

impl ColumnKind {
    /// Map a ClickHouse base type name
    pub fn from_clickhouse(type_name: &str) -> Self {
        match type_name {
            "Bool" => Self::Boolean,
            "Float32" | "Float64" => Self::Float,
            "Date" | "Date32" => Self::Date,
            "String" | "UUID" => Self::Text,
            t if t.starts_with("UInt") || t.starts_with("Int") => Self::Integer,
            t if t.starts_with("FixedString") || t.starts_with("Enum") => Self::Text,
            t if t.starts_with("DateTime") => Self::DateTime,
            t if t.starts_with("Decimal") => Self::Float,
            _ => Self::Other,
        }
    }
}
