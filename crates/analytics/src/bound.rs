//! Predicates bound to the queryable schema
//!
//! Binding resolves every leaf's field path against the allow-list and
//! coerces its literal to the field's kind. Stores only ever see bound
//! predicates, so unknown fields and mistyped literals fail before execution.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{AnalyticsError, Result};
use crate::filter::{Condition, Operator, Predicate};
use crate::schema::{Field, FieldValue, Record};

/// A leaf test against one field
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Eq(FieldValue),
    Ne(FieldValue),
    Gt(FieldValue),
    Gte(FieldValue),
    Lt(FieldValue),
    Lte(FieldValue),
    In(Vec<FieldValue>),
    /// Lowercased needle
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundCondition {
    pub field: Field,
    pub test: Test,
}

/// Predicate with resolved fields and typed literals
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPredicate {
    All,
    Condition(BoundCondition),
    And(Vec<BoundPredicate>),
    Or(Vec<BoundPredicate>),
    Not(Box<BoundPredicate>),
}

impl Predicate {
    /// Bind to the schema, checking fields and literal types
    pub fn bind(&self) -> Result<BoundPredicate> {
        Ok(match self {
            Predicate::All => BoundPredicate::All,
            Predicate::Leaf(condition) => BoundPredicate::Condition(condition.bind()?),
            Predicate::And(parts) => BoundPredicate::And(bind_all(parts)?),
            Predicate::Or(parts) => BoundPredicate::Or(bind_all(parts)?),
            Predicate::Not(inner) => BoundPredicate::Not(Box::new(inner.bind()?)),
        })
    }

    /// Validate every leaf against the allow-list without keeping the result
    pub fn check_fields(&self) -> Result<()> {
        self.bind().map(|_| ())
    }
}

fn bind_all(parts: &[Predicate]) -> Result<Vec<BoundPredicate>> {
    parts.iter().map(Predicate::bind).collect()
}

impl Condition {
    pub fn bind(&self) -> Result<BoundCondition> {
        let field = Field::resolve(&self.field)?;

        let scalar = |value: &Value| -> Result<FieldValue> {
            let coerced = field.coerce(value)?;
            if coerced.is_null() {
                return Err(AnalyticsError::type_mismatch(
                    &self.field,
                    format!("`{}` cannot compare against null", self.operator.key()),
                ));
            }
            Ok(coerced)
        };

        let test = match self.operator {
            Operator::Eq => Test::Eq(field.coerce(&self.value)?),
            Operator::Ne => Test::Ne(field.coerce(&self.value)?),
            Operator::Gt => Test::Gt(scalar(&self.value)?),
            Operator::Gte => Test::Gte(scalar(&self.value)?),
            Operator::Lt => Test::Lt(scalar(&self.value)?),
            Operator::Lte => Test::Lte(scalar(&self.value)?),
            Operator::In => {
                let Some(values) = self.value.as_array() else {
                    return Err(AnalyticsError::type_mismatch(
                        &self.field,
                        format!("`in` expects a list of values, got {}", self.value),
                    ));
                };
                Test::In(
                    values
                        .iter()
                        .map(|v| field.coerce(v))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            Operator::Contains => {
                let needle = match &self.value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(AnalyticsError::type_mismatch(
                            &self.field,
                            format!("`contains` expects a string, got {}", other),
                        ));
                    }
                };
                Test::Contains(needle.to_lowercase())
            }
        };

        Ok(BoundCondition { field, test })
    }
}

impl BoundCondition {
    pub fn matches(&self, value: &FieldValue) -> bool {
        let ordered = |literal: &FieldValue, accept: fn(Ordering) -> bool| {
            value.compare(literal).is_some_and(accept)
        };

        match &self.test {
            Test::Eq(FieldValue::Null) => value.is_null(),
            Test::Eq(literal) => !value.is_null() && value == literal,
            Test::Ne(FieldValue::Null) => !value.is_null(),
            Test::Ne(literal) => value.is_null() || value != literal,
            Test::Gt(literal) => ordered(literal, Ordering::is_gt),
            Test::Gte(literal) => ordered(literal, Ordering::is_ge),
            Test::Lt(literal) => ordered(literal, Ordering::is_lt),
            Test::Lte(literal) => ordered(literal, Ordering::is_le),
            Test::In(values) => {
                !value.is_null() && values.iter().any(|v| !v.is_null() && v == value)
            }
            Test::Contains(needle) => value
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(needle.as_str())),
        }
    }
}

impl BoundPredicate {
    /// Evaluate against a record
    pub fn evaluate<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            BoundPredicate::All => true,
            BoundPredicate::Condition(c) => c.matches(&record.field(c.field)),
            BoundPredicate::And(parts) => parts.iter().all(|p| p.evaluate(record)),
            BoundPredicate::Or(parts) => parts.iter().any(|p| p.evaluate(record)),
            BoundPredicate::Not(inner) => !inner.evaluate(record),
        }
    }
}
