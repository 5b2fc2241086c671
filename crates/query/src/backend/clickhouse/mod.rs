//! ClickHouse backend for the blog view store
//!
//! Statements are POSTed to the HTTP interface with `FORMAT JSONCompact`, so
//! column names and server types come back alongside the rows. Every request
//! runs read-only with a server-side `max_execution_time`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::backend::{QueryBackend, validate_sql};
use crate::error::QueryError;
use crate::result::{Column, QueryResult};

/// Extra client-side slack on top of the server deadline
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// ClickHouse connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseBackendConfig {
    /// HTTP interface URL (e.g., "http://localhost:8123")
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Server-side deadline in seconds
    pub max_execution_time: u64,
}

impl Default for ClickHouseBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            max_execution_time: 60,
        }
    }
}

impl ClickHouseBackendConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_max_execution_time(mut self, seconds: u64) -> Self {
        self.max_execution_time = seconds;
        self
    }
}

/// Read-only ClickHouse backend over HTTP
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: reqwest::Client,
    config: ClickHouseBackendConfig,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .field("authenticated", &self.config.username.is_some())
            .finish()
    }
}

impl ClickHouseBackend {
    pub fn new(config: &ClickHouseBackendConfig) -> Self {
        let timeout = Duration::from_secs(config.max_execution_time) + CLIENT_TIMEOUT_SLACK;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            config: config.clone(),
        }
    }

    pub fn from_url(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self::new(&ClickHouseBackendConfig::new(url, database))
    }

    pub fn config(&self) -> &ClickHouseBackendConfig {
        &self.config
    }

    /// Settings sent as URL parameters with every statement
    ///
    /// `readonly=2` still rejects writes but lets the remaining settings apply.
    fn settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("database", self.config.database.clone()),
            ("readonly", "2".to_string()),
            (
                "max_execution_time",
                self.config.max_execution_time.to_string(),
            ),
            ("output_format_json_quote_64bit_integers", "0".to_string()),
        ]
    }

    /// POST a statement and return the response body
    async fn post(&self, statement: String) -> Result<String, QueryError> {
        let mut request = self
            .client
            .post(self.config.url.as_str())
            .query(&self.settings())
            .body(statement);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(QueryError::Server {
                status: status.as_u16(),
                message: exception_message(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl QueryBackend for ClickHouseBackend {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        validate_sql(sql)?;

        let start = Instant::now();
        let statement = format!("{} FORMAT JSONCompact", sql.trim().trim_end_matches(';'));
        let body = self.post(statement).await?;
        let result = parse_compact(&body)?.with_elapsed(start.elapsed().as_millis() as u64);

        debug!(
            rows = result.len(),
            cols = result.columns.len(),
            elapsed_ms = result.elapsed_ms,
            "clickhouse query executed"
        );

        Ok(result)
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        self.post("SELECT 1".to_string()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

/// `FORMAT JSONCompact` response body
#[derive(Debug, Deserialize)]
struct CompactResponse {
    meta: Vec<CompactColumn>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct CompactColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

fn parse_compact(body: &str) -> Result<QueryResult, QueryError> {
    let response: CompactResponse = serde_json::from_str(body)?;

    let columns: Vec<Column> = response
        .meta
        .into_iter()
        .map(|c| Column::from_clickhouse(c.name, &c.type_name))
        .collect();

    if let Some(row) = response.data.iter().find(|r| r.len() != columns.len()) {
        return Err(QueryError::Decode(format!(
            "row has {} cells for {} columns",
            row.len(),
            columns.len()
        )));
    }

    Ok(QueryResult::new(columns, response.data))
}

/// First line of a ClickHouse exception body, without the stack trace
fn exception_message(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or("").trim();
    match line.find(" (version ") {
        Some(idx) => line[..idx].to_string(),
        None => line.to_string(),
    }
}
