//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Required field missing for the selected backend
    #[error("[{section}] backend '{backend}' requires '{field}'")]
    MissingField {
        /// Config section (e.g., "query")
        section: &'static str,
        /// Backend that needs the field
        backend: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// Field present but unusable
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        /// Config section
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(section: &'static str, backend: &'static str, field: &'static str) -> Self {
        Self::MissingField {
            section,
            backend,
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("query", "clickhouse", "url");
        let msg = err.to_string();
        assert!(msg.contains("[query]"));
        assert!(msg.contains("clickhouse"));
        assert!(msg.contains("'url'"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("query", "table", "must be an identifier");
        assert_eq!(
            err.to_string(),
            "[query] has invalid table: must be an identifier"
        );
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ConfigError::IoError {
            path: "missing.toml".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("missing.toml"));
    }
}
