//! Metric output rows
//!
//! Every selector shapes its result into `{x, y, z}` triples: `y` is always a
//! view count, `x` and `z` depend on the selector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of the `x` or `z` slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Label (dimension value or bucket label)
    Text(String),
    /// Count
    Count(u64),
    /// Percent change
    Percent(f64),
}

impl MetricValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_percent(&self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Count(n) => write!(f, "{}", n),
            Self::Percent(p) => write!(f, "{}", p),
        }
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<u64> for MetricValue {
    fn from(n: u64) -> Self {
        Self::Count(n)
    }
}

impl From<f64> for MetricValue {
    fn from(p: f64) -> Self {
        Self::Percent(p)
    }
}

/// One output row of a selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub x: MetricValue,
    pub y: u64,
    pub z: MetricValue,
}

impl MetricRow {
    pub fn new(x: impl Into<MetricValue>, y: u64, z: impl Into<MetricValue>) -> Self {
        Self {
            x: x.into(),
            y,
            z: z.into(),
        }
    }
}

/// Percent change from the previous bucket
///
/// No previous bucket yields 0. A previous count of zero yields 100 when the
/// current count is positive, 0 otherwise. Rounded to two decimals.
pub fn percent_growth(previous: Option<u64>, current: u64) -> f64 {
    match previous {
        None => 0.0,
        Some(0) if current > 0 => 100.0,
        Some(0) => 0.0,
        Some(prev) => {
            let change = (current as f64 - prev as f64) / prev as f64 * 100.0;
            (change * 100.0).round() / 100.0
        }
    }
}
