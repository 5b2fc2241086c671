//! Date bounds and time buckets
//!
//! Bounds restrict views to an inclusive `viewed_at` window. Buckets truncate
//! timestamps to day, ISO week, month or year for time-series grouping.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::filter::Condition;

/// Inclusive `viewed_at` bounds, either side optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateBounds {
    /// Start of the range (inclusive)
    pub start: Option<DateTime<Utc>>,
    /// End of the range (inclusive)
    pub end: Option<DateTime<Utc>>,
}

impl DateBounds {
    /// Parse optional start and end bounds
    ///
    /// A bound without a time component covers the whole day: a start date
    /// becomes 00:00:00 and an end date 23:59:59, both UTC.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = start
            .filter(|s| !s.trim().is_empty())
            .map(parse_start)
            .transpose()?;
        let end = end
            .filter(|s| !s.trim().is_empty())
            .map(parse_end)
            .transpose()?;
        Ok(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Bounds as `viewed_at` leaves
    pub fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(start) = self.start {
            conditions.push(Condition::gte("viewed_at", start.to_rfc3339()));
        }
        if let Some(end) = self.end {
            conditions.push(Condition::lte("viewed_at", end.to_rfc3339()));
        }
        conditions
    }
}

/// Parse a start bound (date only → start of day)
pub fn parse_start(s: &str) -> Result<DateTime<Utc>> {
    match parse_date(s) {
        Some(date) => Ok(start_of_day_naive(date)),
        None => parse_timestamp(s).ok_or_else(|| invalid_bound(s)),
    }
}

/// Parse an end bound (date only → end of day)
pub fn parse_end(s: &str) -> Result<DateTime<Utc>> {
    match parse_date(s) {
        Some(date) => Ok(end_of_day_naive(date)),
        None => parse_timestamp(s).ok_or_else(|| invalid_bound(s)),
    }
}

fn invalid_bound(s: &str) -> AnalyticsError {
    AnalyticsError::InvalidTimeRange(format!(
        "invalid date: {} (use YYYY-MM-DD or an ISO-8601 date-time)",
        s
    ))
}

/// Parse an ISO-8601 timestamp
///
/// Accepts RFC 3339, naive date-times (UTC) with `T` or space separator, and
/// plain dates (midnight UTC).
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(s).map(start_of_day_naive)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn start_of_day_naive(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// 23:59:59 of the given day
fn end_of_day_naive(date: NaiveDate) -> DateTime<Utc> {
    start_of_day_naive(date) + Duration::seconds(86_399)
}

/// Time bucket for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Day,
    /// ISO week, starting Monday
    Week,
    Month,
    Year,
}

impl Bucket {
    /// Parse bucket from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            _ => Err(AnalyticsError::InvalidParameter(format!(
                "unknown time bucket: {}",
                s
            ))),
        }
    }

    /// First day of the bucket containing `ts`
    pub fn truncate(&self, ts: DateTime<Utc>) -> NaiveDate {
        let date = ts.date_naive();
        match self {
            Self::Day => date,
            Self::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Self::Month => date.with_day(1).unwrap_or(date),
            Self::Year => date.with_day(1).and_then(|d| d.with_month(1)).unwrap_or(date),
        }
    }

    /// ClickHouse truncation function for this bucket
    pub fn clickhouse_fn(&self) -> &'static str {
        match self {
            Self::Day => "toDate",
            Self::Week => "toMonday",
            Self::Month => "toStartOfMonth",
            Self::Year => "toStartOfYear",
        }
    }

    /// Display label for a bucket start
    ///
    /// `YYYY-MM-DD`, `YYYY-Www` (ISO week year and week), `YYYY-MM`, `YYYY`.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Month => date.format("%Y-%m").to_string(),
            Self::Year => date.format("%Y").to_string(),
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(s)
    }
}
