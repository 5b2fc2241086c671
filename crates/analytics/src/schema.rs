//! Queryable fields of a blog view
//!
//! Filter documents address fields by relation path (`blog__user__id`,
//! `viewer_country`). Only the paths listed here can reach a store; every
//! literal is coerced to the field's kind before it is evaluated or rendered.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{AnalyticsError, Result};
use crate::timerange::parse_timestamp;

/// A field of the denormalized view record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// View id
    ViewId,
    /// View timestamp
    ViewedAt,
    /// Id of the viewed blog
    BlogId,
    /// Title of the viewed blog
    BlogTitle,
    /// Owner of the viewed blog
    BlogOwner,
    /// Country code of the viewed blog
    BlogCountryCode,
    /// Country name of the viewed blog
    BlogCountryName,
    /// Viewing user id
    ViewerUser,
    /// Viewer country code
    ViewerCountryCode,
    /// Viewer country name
    ViewerCountryName,
}

/// Value kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Timestamp,
}

impl Field {
    /// All queryable fields
    pub const ALL: [Field; 10] = [
        Field::ViewId,
        Field::ViewedAt,
        Field::BlogId,
        Field::BlogTitle,
        Field::BlogOwner,
        Field::BlogCountryCode,
        Field::BlogCountryName,
        Field::ViewerUser,
        Field::ViewerCountryCode,
        Field::ViewerCountryName,
    ];

    /// Resolve a relation path to a field
    ///
    /// `.` is accepted in place of `__`.
    pub fn resolve(path: &str) -> Result<Self> {
        let normalized = path.trim().replace('.', "__");
        let field = match normalized.as_str() {
            "id" => Self::ViewId,
            "viewed_at" => Self::ViewedAt,
            "blog" | "blog_id" | "blog__id" => Self::BlogId,
            "blog__title" => Self::BlogTitle,
            "blog__user" | "blog__user_id" | "blog__user__id" => Self::BlogOwner,
            "blog__country" | "blog__country__code" => Self::BlogCountryCode,
            "blog__country__name" => Self::BlogCountryName,
            "viewer_user" | "viewer_user_id" | "viewer_user__id" => Self::ViewerUser,
            "viewer_country" | "viewer_country__code" => Self::ViewerCountryCode,
            "viewer_country__name" => Self::ViewerCountryName,
            _ => return Err(AnalyticsError::InvalidField(path.to_string())),
        };
        Ok(field)
    }

    /// Canonical relation path
    pub fn path(&self) -> &'static str {
        match self {
            Self::ViewId => "id",
            Self::ViewedAt => "viewed_at",
            Self::BlogId => "blog__id",
            Self::BlogTitle => "blog__title",
            Self::BlogOwner => "blog__user__id",
            Self::BlogCountryCode => "blog__country__code",
            Self::BlogCountryName => "blog__country__name",
            Self::ViewerUser => "viewer_user__id",
            Self::ViewerCountryCode => "viewer_country__code",
            Self::ViewerCountryName => "viewer_country__name",
        }
    }

    /// Column in the denormalized `blog_views` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::ViewId => "id",
            Self::ViewedAt => "viewed_at",
            Self::BlogId => "blog_id",
            Self::BlogTitle => "blog_title",
            Self::BlogOwner => "blog_user_id",
            Self::BlogCountryCode => "blog_country_code",
            Self::BlogCountryName => "blog_country_name",
            Self::ViewerUser => "viewer_user_id",
            Self::ViewerCountryCode => "viewer_country_code",
            Self::ViewerCountryName => "viewer_country_name",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::ViewId | Self::BlogId => FieldKind::Integer,
            Self::ViewedAt => FieldKind::Timestamp,
            _ => FieldKind::Text,
        }
    }

    /// Whether the field can be absent on a view
    pub fn nullable(&self) -> bool {
        matches!(
            self,
            Self::BlogCountryCode
                | Self::BlogCountryName
                | Self::ViewerUser
                | Self::ViewerCountryCode
                | Self::ViewerCountryName
        )
    }

    /// Coerce a JSON literal to this field's kind
    pub fn coerce(&self, value: &Value) -> Result<FieldValue> {
        let mismatch = |expected: &str| {
            AnalyticsError::type_mismatch(
                self.path(),
                format!("expected {}, got {}", expected, value),
            )
        };

        if value.is_null() {
            return Ok(FieldValue::Null);
        }

        match self.kind() {
            FieldKind::Integer => match value {
                Value::Number(n) => n.as_i64().map(FieldValue::Integer).ok_or_else(|| mismatch("an integer")),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(FieldValue::Integer)
                    .map_err(|_| mismatch("an integer")),
                _ => Err(mismatch("an integer")),
            },
            FieldKind::Text => match value {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
                _ => Err(mismatch("a string")),
            },
            FieldKind::Timestamp => match value {
                Value::String(s) => parse_timestamp(s)
                    .map(FieldValue::Timestamp)
                    .ok_or_else(|| mismatch("an ISO-8601 timestamp")),
                _ => Err(mismatch("an ISO-8601 timestamp")),
            },
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Relational comparison; `None` when either side is null or kinds differ
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// String form used for substring matching and labels
    ///
    /// Timestamps use `YYYY-MM-DD HH:MM:SS`, the form ClickHouse `toString` yields.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Text(_) => 1,
            Self::Timestamp(_) => 2,
            Self::Null => 3,
        }
    }
}

/// Total order used for grouping keys: nulls sort last
impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(s: Option<&str>) -> Self {
        s.map(FieldValue::from).unwrap_or(FieldValue::Null)
    }
}

/// Anything a bound predicate can be evaluated against
pub trait Record {
    fn field(&self, field: Field) -> FieldValue;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(Field::resolve("blog").unwrap(), Field::BlogId);
        assert_eq!(Field::resolve("blog__id").unwrap(), Field::BlogId);
        assert_eq!(Field::resolve("blog.user.id").unwrap(), Field::BlogOwner);
        assert_eq!(Field::resolve("viewer_country").unwrap(), Field::ViewerCountryCode);
        assert_eq!(
            Field::resolve("viewer_country__name").unwrap(),
            Field::ViewerCountryName
        );
    }

    #[test]
    fn test_resolve_unknown() {
        let err = Field::resolve("blog__user__password").unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidField(ref p) if p == "blog__user__password"));
        assert!(Field::resolve("1=1; DROP TABLE").is_err());
    }

    #[test]
    fn test_canonical_path_round_trips() {
        for field in Field::ALL {
            assert_eq!(Field::resolve(field.path()).unwrap(), field);
        }
    }

    #[test]
    fn test_coerce_integer() {
        let f = Field::BlogId;
        assert_eq!(f.coerce(&json!(7)).unwrap(), FieldValue::Integer(7));
        assert_eq!(f.coerce(&json!("12")).unwrap(), FieldValue::Integer(12));
        assert_eq!(f.coerce(&json!(null)).unwrap(), FieldValue::Null);
        assert!(matches!(
            f.coerce(&json!("abc")),
            Err(AnalyticsError::TypeMismatch { .. })
        ));
        assert!(f.coerce(&json!(1.5)).is_err());
    }

    #[test]
    fn test_coerce_text() {
        let f = Field::ViewerUser;
        assert_eq!(f.coerce(&json!("u1")).unwrap(), FieldValue::from("u1"));
        assert_eq!(f.coerce(&json!(42)).unwrap(), FieldValue::from("42"));
        assert_eq!(f.coerce(&json!(true)).unwrap(), FieldValue::from("true"));
        assert!(f.coerce(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_coerce_timestamp() {
        let f = Field::ViewedAt;
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            f.coerce(&json!("2024-01-01")).unwrap(),
            FieldValue::Timestamp(expected)
        );
        assert_eq!(
            f.coerce(&json!("2024-01-01T00:00:00Z")).unwrap(),
            FieldValue::Timestamp(expected)
        );
        assert!(f.coerce(&json!("yesterday")).is_err());
        assert!(f.coerce(&json!(1704067200)).is_err());
    }

    #[test]
    fn test_nulls_sort_last() {
        let mut values = vec![
            FieldValue::Null,
            FieldValue::from("b"),
            FieldValue::from("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![FieldValue::from("a"), FieldValue::from("b"), FieldValue::Null]
        );
    }

    #[test]
    fn test_compare_with_null_is_none() {
        assert_eq!(FieldValue::Null.compare(&FieldValue::Integer(1)), None);
        assert_eq!(
            FieldValue::Integer(1).compare(&FieldValue::Integer(2)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_timestamp_text_form() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            FieldValue::Timestamp(ts).as_text().unwrap(),
            "2024-03-05 14:07:09"
        );
    }
}
