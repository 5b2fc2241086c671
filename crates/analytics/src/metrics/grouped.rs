//! Grouped view metrics
//!
//! Views per time bucket and viewer dimension: distinct blogs viewed and total
//! views. Views without the dimension are grouped under "Unknown".

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::filter::Predicate;
use crate::metrics::Metric;
use crate::output::MetricRow;
use crate::plan::{Aggregate, AggregateQuery, AggregateRow, SortOrder};
use crate::schema::Field;
use crate::timerange::Bucket;

/// Label for views without the grouped dimension
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Viewer dimension to group by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Country,
    User,
}

impl ObjectType {
    /// Parse object type from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(Self::Country),
            "user" => Ok(Self::User),
            _ => Err(AnalyticsError::InvalidParameter(format!(
                "unknown object type: {} (use country or user)",
                s
            ))),
        }
    }

    pub fn dimension(&self) -> Field {
        match self {
            Self::Country => Field::ViewerCountryCode,
            Self::User => Field::ViewerUser,
        }
    }
}

/// Bucket size for grouped metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeType {
    Month,
    Week,
    Year,
}

impl RangeType {
    /// Parse range type from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            "year" => Ok(Self::Year),
            _ => Err(AnalyticsError::InvalidParameter(format!(
                "unknown range: {} (use month, week or year)",
                s
            ))),
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Month => Bucket::Month,
            Self::Week => Bucket::Week,
            Self::Year => Bucket::Year,
        }
    }
}

/// Grouped view metric
pub struct GroupedMetric {
    object_type: ObjectType,
    range: RangeType,
}

impl GroupedMetric {
    /// Create a new grouped metric
    pub fn new(object_type: ObjectType, range: RangeType) -> Self {
        Self { object_type, range }
    }
}

impl Metric for GroupedMetric {
    fn build_query(&self, predicate: &Predicate) -> AggregateQuery {
        AggregateQuery::new(predicate.clone())
            .with_bucket(self.range.bucket())
            .group_by(self.object_type.dimension())
            .aggregate(Aggregate::CountDistinct(Field::BlogId))
            .aggregate(Aggregate::Count)
            .with_order(SortOrder::GroupsAscending)
    }

    fn shape(&self, rows: Vec<AggregateRow>) -> Vec<MetricRow> {
        rows.iter()
            .map(|row| {
                let label = row
                    .key(0)
                    .as_text()
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                MetricRow::new(label, row.value(0), row.value(1))
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "grouped"
    }
}
