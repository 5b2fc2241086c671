//! Filter expression compiler
//!
//! Turns an untrusted, nested filter document into a [`Predicate`] tree.
//!
//! ```text
//! FilterDoc := {} | {"and": [FilterDoc,...]} | {"or": [FilterDoc,...]} | {"not": [FilterDoc,...]}
//!            | {"field": string, <op>: value}   where <op> ∈ {eq,ne,gt,gte,lt,lte,in,contains}
//! ```
//!
//! Keys present on the same node are combined with AND. Unrecognized structure
//! compiles to [`Predicate::All`] and is reported with a warning; the only
//! rejection is nesting deeper than [`MAX_FILTER_DEPTH`]. Field names and
//! literal types are checked later, when the predicate is bound to the schema.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{AnalyticsError, Result};

/// Maximum nesting of logical nodes in a filter document
pub const MAX_FILTER_DEPTH: usize = 32;

/// Leaf operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal (`eq null` tests for null)
    Eq,
    /// Not equal (`ne null` tests for not null)
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// In list
    In,
    /// Case-insensitive substring
    Contains,
}

impl Operator {
    /// Leaf operators in lookup order; the first key present on a leaf wins
    pub const ALL: [Operator; 8] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::Contains,
    ];

    /// Document key for this operator
    pub fn key(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }

    /// Parse operator from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "eq" | "=" | "==" => Ok(Self::Eq),
            "ne" | "!=" | "<>" => Ok(Self::Ne),
            "gt" | ">" => Ok(Self::Gt),
            "gte" | ">=" => Ok(Self::Gte),
            "lt" | "<" => Ok(Self::Lt),
            "lte" | "<=" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "contains" => Ok(Self::Contains),
            _ => Err(AnalyticsError::InvalidFilter(format!(
                "unknown operator: {}",
                s
            ))),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }
}

/// A single leaf comparison, as written by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Field path to filter on
    pub field: String,
    /// Operator for comparison
    pub operator: Operator,
    /// Literal to compare against
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Create an equality condition
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Create a not-equal condition
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lte, value)
    }

    /// Create an IN condition
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        Self::new(field, Operator::In, Value::Array(values))
    }

    /// Create a contains condition
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Contains, value)
    }

    /// Create a field-is-set condition (`ne null`)
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Ne, Value::Null)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.symbol(), self.value)
    }
}

/// Compiled boolean predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record (identity of AND)
    All,
    Leaf(Condition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction; flattens nested ANDs and drops identities
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::All => {}
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::All,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    /// Disjunction; flattens nested ORs
    ///
    /// An empty disjunction is the identity, so `or: []` constrains nothing.
    pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::All,
            1 => flat.remove(0),
            _ => Predicate::Or(flat),
        }
    }

    /// Negation; removes double negation
    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// AND a leaf onto this predicate
    pub fn with_condition(self, condition: Condition) -> Self {
        Predicate::and([self, Predicate::Leaf(condition)])
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Predicate::All)
    }

    /// All leaf conditions, depth first
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            Predicate::All => {}
            Predicate::Leaf(c) => out.push(c),
            Predicate::And(parts) | Predicate::Or(parts) => {
                for p in parts {
                    p.collect_conditions(out);
                }
            }
            Predicate::Not(inner) => inner.collect_conditions(out),
        }
    }
}

impl From<Condition> for Predicate {
    fn from(condition: Condition) -> Self {
        Predicate::Leaf(condition)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => f.write_str("TRUE"),
            Predicate::Leaf(c) => write!(f, "{}", c),
            Predicate::And(parts) => write_joined(f, parts, " AND "),
            Predicate::Or(parts) => write_joined(f, parts, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", part)?;
    }
    f.write_str(")")
}

/// Compile an optional filter document
///
/// An absent, null or empty document matches everything.
pub fn compile(doc: Option<&Value>) -> Result<Predicate> {
    match doc {
        None | Some(Value::Null) => Ok(Predicate::All),
        Some(value) => compile_node(value, 0),
    }
}

/// Parse a JSON filter string and compile it
pub fn compile_str(s: &str) -> Result<Predicate> {
    if s.trim().is_empty() {
        return Ok(Predicate::All);
    }
    let doc: Value = serde_json::from_str(s)
        .map_err(|e| AnalyticsError::InvalidFilter(format!("malformed filter JSON: {}", e)))?;
    compile(Some(&doc))
}

fn compile_node(value: &Value, depth: usize) -> Result<Predicate> {
    if depth > MAX_FILTER_DEPTH {
        return Err(AnalyticsError::InvalidFilter(format!(
            "filter nested deeper than {} levels",
            MAX_FILTER_DEPTH
        )));
    }

    let Some(node) = value.as_object() else {
        warn!(node = %value, "ignoring non-object filter node");
        return Ok(Predicate::All);
    };

    let mut parts = Vec::new();

    if let Some(children) = logical_children(node, "and") {
        parts.push(Predicate::and(compile_children(children, depth)?));
    }
    if let Some(children) = logical_children(node, "or") {
        parts.push(Predicate::or(compile_children(children, depth)?));
    }
    if let Some(children) = logical_children(node, "not") {
        // "none of these match"
        if !children.is_empty() {
            parts.push(Predicate::or(compile_children(children, depth)?).negate());
        }
    }
    if node.contains_key("field") {
        if let Some(condition) = compile_leaf(node) {
            parts.push(Predicate::Leaf(condition));
        }
    }

    for key in node.keys() {
        let known = matches!(key.as_str(), "and" | "or" | "not" | "field")
            || (node.contains_key("field") && Operator::ALL.iter().any(|op| op.key() == key));
        if !known {
            warn!(key = %key, "ignoring unknown filter key");
        }
    }

    Ok(Predicate::and(parts))
}

fn logical_children<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a [Value]> {
    let value = node.get(key)?;
    match value.as_array() {
        Some(children) => Some(children.as_slice()),
        None => {
            warn!(key, value = %value, "ignoring logical filter key without a list");
            None
        }
    }
}

fn compile_children(children: &[Value], depth: usize) -> Result<Vec<Predicate>> {
    children
        .iter()
        .map(|child| compile_node(child, depth + 1))
        .collect()
}

fn compile_leaf(node: &Map<String, Value>) -> Option<Condition> {
    let Some(field) = node.get("field").and_then(Value::as_str) else {
        warn!("ignoring filter leaf whose field is not a string");
        return None;
    };

    let found = Operator::ALL
        .iter()
        .find_map(|op| node.get(op.key()).map(|value| (*op, value)));

    match found {
        Some((operator, value)) => Some(Condition::new(field, operator, value.clone())),
        None => {
            warn!(field, "ignoring filter leaf without an operator");
            None
        }
    }
}
