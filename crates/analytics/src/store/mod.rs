//! Record stores
//!
//! A store holds blog views and runs [`AggregateQuery`] plans against them.
//! - **Memory**: in-process dataset, for local runs and tests
//! - **SQL**: renders plans to ClickHouse SQL and runs them through a
//!   [`blogstat_query::QueryBackend`]

pub mod memory;
pub mod sql;

#[cfg(test)]
mod memory_test;

use async_trait::async_trait;

use crate::error::Result;
use crate::plan::{AggregateQuery, AggregateRow};

pub use memory::MemoryStore;
pub use sql::SqlStore;

/// Record store trait
///
/// Every call is a single read; implementations provide their own read
/// consistency.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run an aggregate query, returning rows in the query's order
    async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>>;

    /// Check if the store is available
    async fn health_check(&self) -> Result<()>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}
