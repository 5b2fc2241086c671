//! Analytics error types

use thiserror::Error;

/// Analytics errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Filter document rejected (nesting too deep)
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Filter references a field outside the queryable set
    #[error("unknown filter field: {0}")]
    InvalidField(String),

    /// Filter value cannot be used with the field or operator
    #[error("type mismatch on '{field}': {message}")]
    TypeMismatch {
        /// Field path as written by the caller
        field: String,
        /// What was wrong with the value
        message: String,
    },

    /// Invalid date bound
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Invalid selector parameter (object type, range, top type, compare type)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Record references an entity the store does not hold, or a duplicate id
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Dataset could not be read or decoded
    #[error("invalid dataset: {0}")]
    Dataset(String),

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Backend error (from blogstat-query)
    #[error("backend error: {0}")]
    Backend(#[from] blogstat_query::QueryError),
}

impl AnalyticsError {
    /// Create a TypeMismatch error
    pub fn type_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
