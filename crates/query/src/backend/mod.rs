//! Query backend trait and implementations

pub mod clickhouse;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::result::QueryResult;

/// Query backend trait
///
/// Implemented by the ClickHouse backend; analytics stores accept any
/// implementation so tests can substitute canned results.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a read-only SQL query
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Validate SQL query - only allow SELECT and WITH (CTE) queries
///
/// Analytics SQL is generated from an allow-listed plan, so this only guards
/// against rendering bugs reaching the server as something other than a read.
pub fn validate_sql(sql: &str) -> Result<(), QueryError> {
    let stripped = strip_string_literals(sql);
    let trimmed = stripped.trim();
    let upper = trimmed.to_uppercase();

    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(QueryError::InvalidSql(
            "only SELECT and WITH queries are allowed".to_string(),
        ));
    }

    if upper.contains(" INTO ") {
        return Err(QueryError::InvalidSql(
            "SELECT INTO is not allowed".to_string(),
        ));
    }

    // Trailing semicolon is tolerated, statement chaining is not
    if trimmed.trim_end_matches(';').contains(';') {
        return Err(QueryError::InvalidSql(
            "multiple statements not allowed".to_string(),
        ));
    }

    // The backend picks the wire format itself
    if upper.contains(" FORMAT ") {
        return Err(QueryError::InvalidSql(
            "FORMAT clause is set by the backend".to_string(),
        ));
    }

    Ok(())
}

/// Blank out the contents of single-quoted literals
///
/// Filter values end up as escaped literals (`''` and `\'` both escape a
/// quote), and their text must not trip the keyword checks above.
fn strip_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if !in_literal {
            if c == '\'' {
                in_literal = true;
            }
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                chars.next();
            }
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
            }
            '\'' => {
                in_literal = false;
                out.push(c);
            }
            _ => {}
        }
    }

    out
}
