//! Query builder for generating SQL from aggregate plans
//!
//! Builds ClickHouse-compatible SQL over the denormalized `blog_views` table:
//! - Bound predicates (WHERE clauses)
//! - Time buckets over `viewed_at`
//! - Grouping fields and aggregates (GROUP BY)
//! - Ordering and limits
//!
//! Identifiers only ever come from the field allow-list and every literal is
//! escaped, so filter documents never reach SQL text unescaped.

use crate::bound::{BoundCondition, BoundPredicate, Test};
use crate::error::Result;
use crate::plan::{Aggregate, AggregateQuery, SortOrder};
use crate::schema::{Field, FieldValue};
use crate::timerange::Bucket;

/// Alias of the bucket column in rendered SQL
pub const BUCKET_ALIAS: &str = "bucket";

/// Alias of the grouping key at `index`
pub fn key_alias(index: usize) -> String {
    format!("k{}", index)
}

/// Alias of the aggregate at `index`
pub fn value_alias(index: usize) -> String {
    format!("v{}", index)
}

/// Query builder for analytics SQL
pub struct QueryBuilder {
    table: String,
    select: Vec<String>,
    where_clauses: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u32>,
}

impl QueryBuilder {
    /// Create a new query builder for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Vec::new(),
            where_clauses: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Add a SELECT column
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    /// Add a SELECT column with alias
    pub fn select_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.select.push(format!("{} AS {}", expr.into(), alias.into()));
        self
    }

    /// Add a WHERE clause
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clauses.push(clause.into());
        self
    }

    /// Add a GROUP BY column
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Add an ORDER BY column
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Add ORDER BY with direction
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(format!("{} DESC", column.into()));
        self
    }

    /// Set LIMIT
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply a bound predicate as a WHERE clause
    ///
    /// The match-everything predicate adds nothing.
    pub fn apply_predicate(mut self, predicate: &BoundPredicate) -> Self {
        if !matches!(predicate, BoundPredicate::All) {
            self.where_clauses.push(predicate_to_sql(predicate));
        }
        self
    }

    /// Add time bucket SELECT and GROUP BY
    ///
    /// The bucket is selected as a `YYYY-MM-DD` string, truncated in UTC
    /// whatever the server or column timezone.
    pub fn with_time_bucket(mut self, bucket: Bucket, timestamp_col: &str, alias: &str) -> Self {
        let fn_name = bucket.clickhouse_fn();
        self.select.insert(
            0,
            format!("toString({}({}, 'UTC')) AS {}", fn_name, timestamp_col, alias),
        );
        self.group_by.insert(0, alias.to_string());
        self
    }

    /// Build the final SQL query
    pub fn build(self) -> String {
        let mut sql = String::new();

        // SELECT
        sql.push_str("SELECT ");
        if self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.join(", "));
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        // WHERE
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        // LIMIT
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

/// Render an aggregate plan as SQL against `table`
///
/// Columns are aliased `bucket`, `k0..` for grouping keys and `v0..` for
/// aggregates.
pub fn aggregate_query_sql(query: &AggregateQuery, table: &str) -> Result<String> {
    let predicate = query.predicate.bind()?;
    let mut builder = QueryBuilder::new(escape_table(table));

    if let Some(bucket) = query.bucket {
        builder = builder.with_time_bucket(bucket, Field::ViewedAt.column(), BUCKET_ALIAS);
    }

    for (i, field) in query.group_by.iter().enumerate() {
        let alias = key_alias(i);
        builder = builder.select_as(field.column(), &alias).group_by(alias);
    }

    for (i, aggregate) in query.aggregates.iter().enumerate() {
        builder = builder.select_as(aggregate_to_sql(aggregate), value_alias(i));
    }

    builder = builder.apply_predicate(&predicate);

    let group_order = |mut builder: QueryBuilder| {
        if query.bucket.is_some() {
            builder = builder.order_by(BUCKET_ALIAS);
        }
        for i in 0..query.group_by.len() {
            builder = builder.order_by(key_alias(i));
        }
        builder
    };

    builder = match query.order {
        SortOrder::GroupsAscending => group_order(builder),
        SortOrder::ValueDescending(index) => group_order(builder.order_by_desc(value_alias(index))),
    };

    if let Some(limit) = query.limit {
        builder = builder.limit(limit);
    }

    Ok(builder.build())
}

fn aggregate_to_sql(aggregate: &Aggregate) -> String {
    match aggregate {
        Aggregate::Count => "COUNT(*)".to_string(),
        Aggregate::CountDistinct(field) => format!("COUNT(DISTINCT {})", field.column()),
    }
}

/// Convert a bound predicate to a SQL boolean expression
pub fn predicate_to_sql(predicate: &BoundPredicate) -> String {
    match predicate {
        BoundPredicate::All => "1".to_string(),
        BoundPredicate::Condition(c) => condition_to_sql(c),
        BoundPredicate::And(parts) if parts.is_empty() => "1".to_string(),
        BoundPredicate::Or(parts) if parts.is_empty() => "0".to_string(),
        BoundPredicate::And(parts) => join_sql(parts, " AND "),
        BoundPredicate::Or(parts) => join_sql(parts, " OR "),
        BoundPredicate::Not(inner) => format!("NOT ({})", predicate_to_sql(inner)),
    }
}

fn join_sql(parts: &[BoundPredicate], sep: &str) -> String {
    let rendered: Vec<String> = parts.iter().map(predicate_to_sql).collect();
    format!("({})", rendered.join(sep))
}

/// Convert a bound condition to a SQL WHERE clause
///
/// Nullable columns compare null-safely so `ne` stays the complement of `eq`.
fn condition_to_sql(condition: &BoundCondition) -> String {
    let field = condition.field;
    let col = field.column();
    let nullable = field.nullable();

    let compare = |op: &str, literal: &FieldValue| {
        let clause = format!("{} {} {}", col, op, literal_to_sql(literal));
        if nullable {
            format!("({} IS NOT NULL AND {})", col, clause)
        } else {
            clause
        }
    };

    match &condition.test {
        Test::Eq(FieldValue::Null) => format!("{} IS NULL", col),
        Test::Ne(FieldValue::Null) => format!("{} IS NOT NULL", col),
        Test::Eq(v) => compare("=", v),
        Test::Ne(v) => {
            let clause = format!("{} != {}", col, literal_to_sql(v));
            if nullable {
                format!("({} IS NULL OR {})", col, clause)
            } else {
                clause
            }
        }
        Test::Gt(v) => compare(">", v),
        Test::Gte(v) => compare(">=", v),
        Test::Lt(v) => compare("<", v),
        Test::Lte(v) => compare("<=", v),
        Test::In(values) => {
            let literals: Vec<String> = values
                .iter()
                .filter(|v| !v.is_null())
                .map(literal_to_sql)
                .collect();
            if literals.is_empty() {
                return "0".to_string();
            }
            let clause = format!("{} IN ({})", col, literals.join(", "));
            if nullable {
                format!("({} IS NOT NULL AND {})", col, clause)
            } else {
                clause
            }
        }
        Test::Contains(needle) => {
            let clause = format!(
                "positionCaseInsensitiveUTF8(toString({}), '{}') > 0",
                col,
                escape_string(needle)
            );
            if nullable {
                format!("({} IS NOT NULL AND {})", col, clause)
            } else {
                clause
            }
        }
    }
}

fn literal_to_sql(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "NULL".to_string(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Text(s) => format!("'{}'", escape_string(s)),
        // Sub-second literals keep full precision
        FieldValue::Timestamp(ts) if ts.timestamp_subsec_nanos() != 0 => format!(
            "toDateTime64('{}', 9, 'UTC')",
            ts.format("%Y-%m-%d %H:%M:%S%.9f")
        ),
        FieldValue::Timestamp(ts) => format!(
            "toDateTime('{}', 'UTC')",
            ts.format("%Y-%m-%d %H:%M:%S")
        ),
    }
}

/// Escape a string value for SQL (prevent injection)
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Escape identifier (column/table name)
pub fn escape_identifier(s: &str) -> String {
    // Only allow alphanumeric and underscore
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        s.to_string()
    } else {
        // Quote with backticks for safety
        format!("`{}`", s.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Escape a possibly database-qualified table name
fn escape_table(table: &str) -> String {
    table
        .split('.')
        .map(escape_identifier)
        .collect::<Vec<_>>()
        .join(".")
}
