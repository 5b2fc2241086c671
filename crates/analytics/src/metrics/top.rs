//! Top-N ranking metric
//!
//! Ranks viewer users, viewer countries or blogs by total views within
//! optional date bounds. Views without the ranked key are excluded before
//! ranking.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::filter::{Condition, Predicate};
use crate::metrics::Metric;
use crate::output::MetricRow;
use crate::plan::{Aggregate, AggregateQuery, AggregateRow, SortOrder};
use crate::schema::Field;
use crate::timerange::DateBounds;

/// Number of ranked rows returned
pub const TOP_LIMIT: u32 = 10;

/// Ranked dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopType {
    User,
    Country,
    Blog,
}

impl TopType {
    /// Parse top type from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "country" => Ok(Self::Country),
            "blog" => Ok(Self::Blog),
            _ => Err(AnalyticsError::InvalidParameter(format!(
                "unknown top type: {} (use user, country or blog)",
                s
            ))),
        }
    }

    /// Field whose nulls are excluded from the ranking
    pub fn ranked_field(&self) -> Field {
        match self {
            Self::User => Field::ViewerUser,
            Self::Country => Field::ViewerCountryCode,
            Self::Blog => Field::BlogId,
        }
    }

    /// Grouping fields
    fn group_by(&self) -> &'static [Field] {
        match self {
            Self::User => &[Field::ViewerUser],
            Self::Country => &[Field::ViewerCountryCode],
            Self::Blog => &[Field::BlogId, Field::BlogTitle],
        }
    }

    /// `x` and `z` distinct counts around the total view count
    fn distinct_fields(&self) -> (Field, Field) {
        match self {
            Self::User => (Field::BlogId, Field::ViewerCountryCode),
            Self::Country => (Field::ViewerUser, Field::BlogId),
            Self::Blog => (Field::ViewerUser, Field::ViewerCountryCode),
        }
    }
}

/// Top-N ranking metric
pub struct TopMetric {
    top_type: TopType,
    bounds: DateBounds,
}

impl TopMetric {
    /// Create a new top metric without date bounds
    pub fn new(top_type: TopType) -> Self {
        Self {
            top_type,
            bounds: DateBounds::default(),
        }
    }

    /// Restrict to inclusive date bounds
    pub fn with_bounds(mut self, bounds: DateBounds) -> Self {
        self.bounds = bounds;
        self
    }
}

impl Metric for TopMetric {
    fn build_query(&self, predicate: &Predicate) -> AggregateQuery {
        let mut filter = predicate.clone();
        for condition in self.bounds.conditions() {
            filter = filter.with_condition(condition);
        }
        filter = filter.with_condition(Condition::is_not_null(self.top_type.ranked_field().path()));

        let (x_field, z_field) = self.top_type.distinct_fields();
        let mut query = AggregateQuery::new(filter);
        for field in self.top_type.group_by() {
            query = query.group_by(*field);
        }

        query
            .aggregate(Aggregate::CountDistinct(x_field))
            .aggregate(Aggregate::Count)
            .aggregate(Aggregate::CountDistinct(z_field))
            .with_order(SortOrder::ValueDescending(1))
            .with_limit(TOP_LIMIT)
    }

    fn shape(&self, rows: Vec<AggregateRow>) -> Vec<MetricRow> {
        rows.iter()
            .map(|row| MetricRow::new(row.value(0), row.value(1), row.value(2)))
            .collect()
    }

    fn name(&self) -> &'static str {
        "top"
    }
}
