//! blogstat Query - SQL transport for blog view analytics
//!
//! Provides the backend interface used by `blogstat-analytics` when the
//! record store lives in a SQL database:
//! - **ClickHouse**: production store, queried over the HTTP interface
//!
//! The analytics crate renders its aggregation plans to SQL and hands the text
//! to a [`QueryBackend`]. Only read-only statements are accepted.
//!
//! # Usage
//!
//! ```ignore
//! use blogstat_query::{ClickHouseBackend, ClickHouseBackendConfig, QueryBackend};
//!
//! let config = ClickHouseBackendConfig::new("http://localhost:8123", "analytics");
//! let backend = ClickHouseBackend::new(&config);
//!
//! let result = backend.execute("SELECT count() AS views FROM blog_views").await?;
//! println!("Rows: {}", result.len());
//! ```

pub mod backend;
pub mod error;
pub mod result;

// Re-exports
pub use backend::QueryBackend;
pub use backend::clickhouse::{ClickHouseBackend, ClickHouseBackendConfig};
pub use error::QueryError;
pub use result::{Column, ColumnKind, QueryResult};

/// Output format for query and metric results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON array of objects
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display_roundtrip() {
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
            assert_eq!(format.to_string().parse::<OutputFormat>(), Ok(format));
        }
    }
}
