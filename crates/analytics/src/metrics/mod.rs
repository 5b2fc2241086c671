//! Metrics engine for blog view analytics
//!
//! Provides the three selectors over blog views:
//!
//! - **grouped**: views per time bucket and viewer dimension
//! - **top**: top 10 users, countries or blogs by view count
//! - **growth**: views per bucket with percent change from the previous bucket

pub mod grouped;
pub mod growth;
pub mod top;

// Re-exports for convenience
pub use grouped::{GroupedMetric, ObjectType, RangeType};
pub use growth::{CompareType, GrowthMetric};
pub use top::{TOP_LIMIT, TopMetric, TopType};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::filter::{Predicate, compile};
use crate::output::MetricRow;
use crate::plan::{AggregateQuery, AggregateRow};
use crate::store::RecordStore;
use crate::timerange::DateBounds;

/// A metric that can be executed against a record store
#[async_trait]
pub trait Metric: Send + Sync {
    /// Build the aggregate plan for views matching `predicate`
    fn build_query(&self, predicate: &Predicate) -> AggregateQuery;

    /// Shape aggregate rows into output rows
    fn shape(&self, rows: Vec<AggregateRow>) -> Vec<MetricRow>;

    /// Get the metric name for logging/identification
    fn name(&self) -> &'static str;

    /// Execute this metric and return output rows
    async fn execute(&self, store: &dyn RecordStore, predicate: &Predicate) -> Result<Vec<MetricRow>> {
        let query = self.build_query(predicate);
        let rows = store.aggregate(&query).await?;
        Ok(self.shape(rows))
    }
}

/// Metrics engine for executing selectors against a store
pub struct MetricsEngine {
    store: Arc<dyn RecordStore>,
}

impl MetricsEngine {
    /// Create a new metrics engine with a store
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Get the store name
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Compile a filter document and execute a metric
    pub async fn execute(&self, metric: &dyn Metric, filters: Option<&Value>) -> Result<Vec<MetricRow>> {
        let predicate = compile(filters)?;
        predicate.check_fields()?;

        let start = Instant::now();
        let rows = metric.execute(self.store.as_ref(), &predicate).await?;
        debug!(
            metric = metric.name(),
            store = self.store.name(),
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "metric executed"
        );

        Ok(rows)
    }

    /// Views per time bucket and viewer country or user
    pub async fn blog_views_get_grouped_metrics(
        &self,
        object_type: ObjectType,
        range: RangeType,
        filters: Option<&Value>,
    ) -> Result<Vec<MetricRow>> {
        let metric = GroupedMetric::new(object_type, range);
        self.execute(&metric, filters).await
    }

    /// Top users, countries or blogs by view count
    ///
    /// Date bounds are inclusive; a bare date covers the whole day.
    pub async fn top_get_ranked(
        &self,
        top_type: TopType,
        start_date: Option<&str>,
        end_date: Option<&str>,
        filters: Option<&Value>,
    ) -> Result<Vec<MetricRow>> {
        let bounds = DateBounds::parse(start_date, end_date)?;
        let metric = TopMetric::new(top_type).with_bounds(bounds);
        self.execute(&metric, filters).await
    }

    /// Views per bucket with growth from the previous bucket
    pub async fn performance_get_time_series(
        &self,
        compare_type: CompareType,
        user_id: Option<&str>,
        filters: Option<&Value>,
    ) -> Result<Vec<MetricRow>> {
        let metric = GrowthMetric::new(compare_type).with_owner(user_id);
        self.execute(&metric, filters).await
    }
}
