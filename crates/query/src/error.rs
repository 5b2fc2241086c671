//! Query error types

/// Errors raised while running SQL against a backend
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Backend could not be reached
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request exceeded the client-side deadline
    #[error("query timed out: {0}")]
    Timeout(String),

    /// Backend answered with an error status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Statement rejected before it was sent
    #[error("invalid SQL: {0}")]
    InvalidSql(String),

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

impl QueryError {
    /// Whether retrying the same statement might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout(err.to_string())
        } else if err.is_decode() || err.is_body() {
            QueryError::Decode(err.to_string())
        } else {
            QueryError::Connection(err.to_string())
        }
    }
}
