//! Time-series growth metric
//!
//! Views per day, week, month or year, optionally restricted to blogs of one
//! owner, with the percent change from the previous bucket.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::filter::{Condition, Predicate};
use crate::metrics::Metric;
use crate::output::{MetricRow, MetricValue, percent_growth};
use crate::plan::{Aggregate, AggregateQuery, AggregateRow, SortOrder};
use crate::schema::Field;
use crate::timerange::Bucket;

/// Bucket size for growth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareType {
    Day,
    Week,
    Month,
    Year,
}

impl CompareType {
    /// Parse compare type from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(AnalyticsError::InvalidParameter(format!(
                "unknown compare type: {} (use day, week, month or year)",
                s
            ))),
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Day => Bucket::Day,
            Self::Week => Bucket::Week,
            Self::Month => Bucket::Month,
            Self::Year => Bucket::Year,
        }
    }
}

/// Growth metric
pub struct GrowthMetric {
    compare_type: CompareType,
    owner: Option<String>,
}

impl GrowthMetric {
    /// Create a new growth metric over all blogs
    pub fn new(compare_type: CompareType) -> Self {
        Self {
            compare_type,
            owner: None,
        }
    }

    /// Restrict to blogs owned by `user_id`; an empty id is ignored
    pub fn with_owner(mut self, user_id: Option<&str>) -> Self {
        self.owner = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        self
    }
}

impl Metric for GrowthMetric {
    fn build_query(&self, predicate: &Predicate) -> AggregateQuery {
        let mut filter = predicate.clone();
        if let Some(owner) = &self.owner {
            filter = filter.with_condition(Condition::eq(Field::BlogOwner.path(), owner.as_str()));
        }

        AggregateQuery::new(filter)
            .with_bucket(self.compare_type.bucket())
            .aggregate(Aggregate::CountDistinct(Field::BlogId))
            .aggregate(Aggregate::Count)
            .with_order(SortOrder::GroupsAscending)
    }

    fn shape(&self, rows: Vec<AggregateRow>) -> Vec<MetricRow> {
        let bucket = self.compare_type.bucket();
        let mut previous = None;
        let mut out = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(start) = row.bucket else {
                continue;
            };
            let views = row.value(1);
            let label = format!("{} ({} blogs)", bucket.label(start), row.value(0));
            out.push(MetricRow::new(
                label,
                views,
                MetricValue::Percent(percent_growth(previous, views)),
            ));
            previous = Some(views);
        }

        out
    }

    fn name(&self) -> &'static str {
        "growth"
    }
}
