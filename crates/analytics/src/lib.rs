//! blogstat Analytics Engine
//!
//! Blog view metrics filtered by caller-supplied filter documents.
//!
//! # Overview
//!
//! This crate provides the analytics layer for blogstat, built on top of
//! `blogstat-query`. It includes:
//!
//! - **Filters**: compiler from nested filter documents to predicate trees
//! - **Schema**: allow-listed view fields and literal coercion
//! - **Query Builder**: SQL generation for ClickHouse
//! - **Stores**: in-memory and SQL record stores running aggregate plans
//! - **Metrics**: grouped metrics, top-N rankings, time-series growth
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use blogstat_analytics::{MemoryStore, MetricsEngine, ObjectType, RangeType};
//!
//! let store = MemoryStore::from_file("data/views.json")?;
//! let engine = MetricsEngine::new(Arc::new(store));
//!
//! let filters = serde_json::json!({
//!     "or": [
//!         {"field": "viewer_country", "eq": "US"},
//!         {"field": "blog__title", "contains": "rust"}
//!     ]
//! });
//! let rows = engine
//!     .blog_views_get_grouped_metrics(ObjectType::Country, RangeType::Month, Some(&filters))
//!     .await?;
//! ```

pub mod bound;
pub mod builder;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod output;
pub mod plan;
pub mod schema;
pub mod store;
pub mod timerange;


// Re-exports for convenience
pub use bound::BoundPredicate;
pub use builder::{QueryBuilder, aggregate_query_sql, predicate_to_sql};
pub use error::{AnalyticsError, Result};
pub use filter::{Condition, MAX_FILTER_DEPTH, Operator, Predicate, compile, compile_str};
pub use metrics::{
    CompareType, GroupedMetric, GrowthMetric, Metric, MetricsEngine, ObjectType, RangeType,
    TOP_LIMIT, TopMetric, TopType,
};
pub use model::{Blog, Country, Dataset, User, ViewEvent};
pub use output::{MetricRow, MetricValue, percent_growth};
pub use plan::{Aggregate, AggregateQuery, AggregateRow, SortOrder};
pub use schema::{Field, FieldKind, FieldValue, Record};
pub use store::{MemoryStore, RecordStore, SqlStore};
pub use timerange::{Bucket, DateBounds};
