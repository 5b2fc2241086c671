//! Record store configuration
//!
//! Selects where blog views are read from: a JSON dataset loaded into memory,
//! or a ClickHouse table queried over HTTP.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default ClickHouse table holding denormalized view rows
pub const DEFAULT_TABLE: &str = "blog_views";

/// Record store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON dataset held in memory (default)
    #[default]
    Memory,
    /// ClickHouse over the HTTP interface
    Clickhouse,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Clickhouse => "clickhouse",
        }
    }
}

/// Query configuration
///
/// # Example
///
/// ```toml
/// # In-memory dataset
/// [query]
/// backend = "memory"
/// data_path = "data/views.json"
///
/// # Or ClickHouse
/// [query]
/// backend = "clickhouse"
/// url = "http://localhost:8123"
/// database = "analytics"
/// table = "blog_views"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub backend: StoreBackend,

    /// Dataset file for the memory backend
    pub data_path: Option<PathBuf>,

    /// ClickHouse HTTP URL
    pub url: Option<String>,

    /// ClickHouse database
    /// Default: "default"
    pub database: String,

    /// Table (or `database.table`) holding view rows
    /// Default: "blog_views"
    pub table: String,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Server-side deadline in seconds
    /// Default: 60
    pub max_execution_time: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            data_path: None,
            url: None,
            database: "default".to_string(),
            table: DEFAULT_TABLE.to_string(),
            username: None,
            password: None,
            max_execution_time: 60,
        }
    }
}

impl QueryConfig {
    /// Check that the selected backend has what it needs
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            StoreBackend::Memory => {
                if self.data_path.is_none() {
                    return Err(ConfigError::missing_field("query", "memory", "data_path"));
                }
            }
            StoreBackend::Clickhouse => {
                match self.url.as_deref() {
                    None => {
                        return Err(ConfigError::missing_field("query", "clickhouse", "url"));
                    }
                    Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                        return Err(ConfigError::invalid_value(
                            "query",
                            "url",
                            format!("'{}' is not an http(s) URL", url),
                        ));
                    }
                    Some(_) => {}
                }
                if self.username.is_some() != self.password.is_some() {
                    return Err(ConfigError::invalid_value(
                        "query",
                        "username",
                        "username and password must be set together",
                    ));
                }
            }
        }

        if self.max_execution_time == 0 {
            return Err(ConfigError::invalid_value(
                "query",
                "max_execution_time",
                "must be greater than zero",
            ));
        }

        if !is_table_name(&self.table) {
            return Err(ConfigError::invalid_value(
                "query",
                "table",
                format!("'{}' is not a plain identifier", self.table),
            ));
        }

        Ok(())
    }
}

/// `name` or `database.name`, each part `[A-Za-z_][A-Za-z0-9_]*`
fn is_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
