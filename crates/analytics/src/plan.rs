//! Aggregate query plan shared by every record store

use chrono::NaiveDate;

use crate::filter::Predicate;
use crate::schema::{Field, FieldValue};
use crate::timerange::Bucket;

/// Maximum allowed limit for query results
pub const MAX_LIMIT: u32 = 10_000;

/// Aggregate over the matched views of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Number of views
    Count,
    /// Number of distinct non-null values of a field
    CountDistinct(Field),
}

/// Row order of an aggregate result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Bucket, then grouping keys, ascending (nulls last)
    #[default]
    GroupsAscending,
    /// Aggregate at this index descending, ties by bucket and keys ascending
    ValueDescending(usize),
}

/// A grouped aggregation over views
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    /// Views to include
    pub predicate: Predicate,
    /// Optional time bucket over `viewed_at`
    pub bucket: Option<Bucket>,
    /// Grouping fields (after the bucket)
    pub group_by: Vec<Field>,
    /// Aggregates, in output order
    pub aggregates: Vec<Aggregate>,
    pub order: SortOrder,
    /// Result limit (max 10,000)
    pub limit: Option<u32>,
}

impl AggregateQuery {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            bucket: None,
            group_by: Vec::new(),
            aggregates: Vec::new(),
            order: SortOrder::default(),
            limit: None,
        }
    }

    /// Set the time bucket
    pub fn with_bucket(mut self, bucket: Bucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Add a grouping field
    pub fn group_by(mut self, field: Field) -> Self {
        self.group_by.push(field);
        self
    }

    /// Add an aggregate
    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Set result limit (capped at MAX_LIMIT)
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.min(MAX_LIMIT));
        self
    }
}

/// One group of an aggregate result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    /// Bucket start, when the query is bucketed
    pub bucket: Option<NaiveDate>,
    /// Grouping key values, in `group_by` order
    pub keys: Vec<FieldValue>,
    /// Aggregate values, in `aggregates` order
    pub values: Vec<u64>,
}

static NULL_KEY: FieldValue = FieldValue::Null;

impl AggregateRow {
    pub fn key(&self, index: usize) -> &FieldValue {
        self.keys.get(index).unwrap_or(&NULL_KEY)
    }

    pub fn value(&self, index: usize) -> u64 {
        self.values.get(index).copied().unwrap_or(0)
    }
}

/// Sort rows in place and apply the limit
pub fn sort_rows(rows: &mut Vec<AggregateRow>, order: SortOrder, limit: Option<u32>) {
    let groups = |a: &AggregateRow, b: &AggregateRow| {
        let bucket = match (a.bucket, b.bucket) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        bucket.then_with(|| a.keys.cmp(&b.keys))
    };

    match order {
        SortOrder::GroupsAscending => rows.sort_by(groups),
        SortOrder::ValueDescending(index) => rows.sort_by(|a, b| {
            b.value(index)
                .cmp(&a.value(index))
                .then_with(|| groups(a, b))
        }),
    }

    if let Some(limit) = limit {
        rows.truncate(limit as usize);
    }
}
