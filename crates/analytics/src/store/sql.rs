//! SQL record store
//!
//! Renders aggregate plans to ClickHouse SQL over a denormalized view table
//! and runs them through a [`QueryBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use blogstat_query::{QueryBackend, QueryResult};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::builder::{BUCKET_ALIAS, aggregate_query_sql, key_alias, value_alias};
use crate::error::{AnalyticsError, Result};
use crate::plan::{AggregateQuery, AggregateRow};
use crate::schema::FieldValue;
use crate::store::RecordStore;

/// Default table holding one row per view
pub const DEFAULT_TABLE: &str = "blog_views";

/// Record store backed by a SQL query backend
pub struct SqlStore {
    backend: Arc<dyn QueryBackend>,
    table: String,
}

impl SqlStore {
    /// Create a store over the default `blog_views` table
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_table(backend, DEFAULT_TABLE)
    }

    pub fn with_table(backend: Arc<dyn QueryBackend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Render the SQL a query would run
    pub fn render(&self, query: &AggregateQuery) -> Result<String> {
        aggregate_query_sql(query, &self.table)
    }
}

impl std::fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore")
            .field("backend", &self.backend.name())
            .field("table", &self.table)
            .finish()
    }
}

#[async_trait]
impl RecordStore for SqlStore {
    async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        let sql = self.render(query)?;
        debug!(backend = self.backend.name(), sql = %sql, "running aggregate query");

        let result = self.backend.execute(&sql).await?;
        parse_rows(query, &result)
    }

    async fn health_check(&self) -> Result<()> {
        self.backend.health_check().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sql"
    }
}

static NULL_CELL: Value = Value::Null;

/// Map backend rows onto aggregate rows by column alias
fn parse_rows(query: &AggregateQuery, result: &QueryResult) -> Result<Vec<AggregateRow>> {
    let column = |name: &str| {
        result.column_index(name).ok_or_else(|| {
            AnalyticsError::QueryFailed(format!("result is missing column '{}'", name))
        })
    };

    let bucket_idx = query.bucket.map(|_| column(BUCKET_ALIAS)).transpose()?;
    let key_idx = (0..query.group_by.len())
        .map(|i| column(key_alias(i).as_str()))
        .collect::<Result<Vec<_>>>()?;
    let value_idx = (0..query.aggregates.len())
        .map(|i| column(value_alias(i).as_str()))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(result.rows.len());
    for raw in &result.rows {
        let cell = |idx: usize| raw.get(idx).unwrap_or(&NULL_CELL);

        let bucket = match bucket_idx {
            Some(idx) => parse_bucket(cell(idx))?,
            None => None,
        };

        let keys = query
            .group_by
            .iter()
            .zip(&key_idx)
            .map(|(field, idx)| field.coerce(cell(*idx)))
            .collect::<Result<Vec<FieldValue>>>()?;

        let values = value_idx
            .iter()
            .map(|idx| parse_count(cell(*idx)))
            .collect::<Result<Vec<u64>>>()?;

        rows.push(AggregateRow {
            bucket,
            keys,
            values,
        });
    }

    Ok(rows)
}

fn parse_bucket(value: &Value) -> Result<Option<NaiveDate>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AnalyticsError::QueryFailed(format!("invalid bucket date: {}", s))),
        other => Err(AnalyticsError::QueryFailed(format!(
            "invalid bucket date: {}",
            other
        ))),
    }
}

/// Counts may arrive as JSON numbers or, for 64-bit integers, as strings
fn parse_count(value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AnalyticsError::QueryFailed(format!("invalid count: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Condition, Predicate};
    use crate::plan::{Aggregate, SortOrder};
    use crate::schema::Field;
    use crate::timerange::Bucket;
    use blogstat_query::{Column, ColumnKind, QueryError};
    use parking_lot::Mutex;
    use serde_json::json;

    struct MockBackend {
        result: QueryResult,
        seen: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn new(result: QueryResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl QueryBackend for MockBackend {
        async fn execute(&self, sql: &str) -> std::result::Result<QueryResult, QueryError> {
            self.seen.lock().push(sql.to_string());
            Ok(self.result.clone())
        }

        async fn health_check(&self) -> std::result::Result<(), QueryError> {
            Err(QueryError::Connection("down".to_string()))
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn columns(names: &[&str]) -> Vec<Column> {
        names
            .iter()
            .map(|n| Column::new(*n, ColumnKind::Text).nullable())
            .collect()
    }

    #[tokio::test]
    async fn test_parses_rows_by_alias() {
        // Cells are looked up by alias, not by SELECT position
        let result = QueryResult::new(
            columns(&["bucket", "k0", "v0", "v1"]),
            vec![
                vec![json!("2024-01-01"), json!("US"), json!(3), json!("5")],
                vec![json!("2024-01-01"), json!(null), json!(1), json!(1)],
            ],
        );
        let backend = MockBackend::new(result);
        let store = SqlStore::new(backend.clone());

        let query = AggregateQuery::new(Predicate::All)
            .with_bucket(Bucket::Month)
            .group_by(Field::ViewerCountryCode)
            .aggregate(Aggregate::CountDistinct(Field::BlogId))
            .aggregate(Aggregate::Count);

        let rows = store.aggregate(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bucket, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(rows[0].keys, vec![FieldValue::from("US")]);
        assert_eq!(rows[0].values, vec![3, 5]);
        assert!(rows[1].key(0).is_null());

        let seen = backend.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("FROM blog_views"));
    }

    #[tokio::test]
    async fn test_integer_keys_from_strings() {
        let result = QueryResult::new(
            columns(&["k0", "k1", "v0"]),
            vec![vec![json!("42"), json!("Title"), json!(7)]],
        );
        let store = SqlStore::new(MockBackend::new(result));
        let query = AggregateQuery::new(Predicate::All)
            .group_by(Field::BlogId)
            .group_by(Field::BlogTitle)
            .aggregate(Aggregate::Count)
            .with_order(SortOrder::ValueDescending(0));

        let rows = store.aggregate(&query).await.unwrap();
        assert_eq!(rows[0].keys[0], FieldValue::Integer(42));
        assert_eq!(rows[0].value(0), 7);
    }

    #[tokio::test]
    async fn test_missing_column_is_error() {
        let result = QueryResult::new(columns(&["k0"]), vec![vec![json!("US")]]);
        let store = SqlStore::new(MockBackend::new(result));
        let query = AggregateQuery::new(Predicate::All)
            .group_by(Field::ViewerCountryCode)
            .aggregate(Aggregate::Count);

        let err = store.aggregate(&query).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_type_mismatch_before_backend() {
        let backend = MockBackend::new(QueryResult::empty());
        let store = SqlStore::new(backend.clone());
        let predicate = Predicate::Leaf(Condition::new(
            "blog",
            crate::filter::Operator::In,
            json!(3),
        ));

        let err = store
            .aggregate(&AggregateQuery::new(predicate).aggregate(Aggregate::Count))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::TypeMismatch { .. }));
        assert!(backend.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_propagates_backend_error() {
        let store = SqlStore::new(MockBackend::new(QueryResult::empty()));
        let err = store.health_check().await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Backend(_)));
    }

    #[test]
    fn test_render_uses_table() {
        let store = SqlStore::with_table(MockBackend::new(QueryResult::empty()), "stats.views");
        let sql = store
            .render(&AggregateQuery::new(Predicate::All).aggregate(Aggregate::Count))
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) AS v0 FROM stats.views");
        assert_eq!(store.table(), "stats.views");
    }
}
