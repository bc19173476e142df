//! Composable filter predicates for SQL WHERE clauses
//!
//! A [`Filter`] renders to a [`Rendered`] pair: clause text with positional
//! `?` placeholders, and the bind values for those placeholders in the same
//! order. Composition wraps every child clause in parentheses and joins
//! them with the combinator's operator; bind values follow a depth-first,
//! left-to-right traversal of the leaves.
//!
//! # Empty combinators
//!
//! A [`Combine`] with no children renders to an **empty** clause with no
//! bind values. Callers must read this as "no filter" (no WHERE clause),
//! which matches every row. It does not mean "match nothing".
//!
//! ```rust
//! use runtara_bo_dao::sql::filter::{self, Filter};
//!
//! let f = Filter::and(vec![
//!     Filter::or(vec![filter::eq("a", 1i64), filter::eq("b", 2i64)]),
//!     filter::eq("c", 3i64),
//! ]);
//! let rendered = f.render();
//! assert_eq!(rendered.clause.as_deref(), Some("((a = ?) OR (b = ?)) AND (c = ?)"));
//! assert_eq!(rendered.bind_values.len(), 3);
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SqlValue;

/// Database vendor tag carried as metadata; rendering never branches on it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseVendor {
    #[default]
    Unknown,
    Postgres,
    MySql,
    Sqlite,
    MsSql,
    Oracle,
}

/// SQL fragment embedded verbatim, bypassing parameter binding
///
/// Only use with trusted text such as `NOW()` or `CURRENT_DATE`. A bare `?`
/// in the text is treated as a placeholder by
/// [`to_numbered`](crate::sql::placeholder::to_numbered); spell PostgreSQL's
/// `?`, `?|` and `?&` operators as `??`, `??|` and `??&`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExpression(String);

impl RawExpression {
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a comparison: a bound literal or a raw expression
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(SqlValue),
    Raw(RawExpression),
}

impl Operand {
    pub fn raw(expr: impl Into<String>) -> Self {
        Operand::Raw(RawExpression::new(expr))
    }

    /// Append this operand's SQL text to `clause`, binding literals
    fn render_into(&self, clause: &mut String, bind_values: &mut Vec<SqlValue>) {
        match self {
            Operand::Raw(expr) => clause.push_str(expr.as_str()),
            Operand::Value(value) => {
                clause.push('?');
                bind_values.push(value.clone());
            }
        }
    }
}

impl From<RawExpression> for Operand {
    fn from(expr: RawExpression) -> Self {
        Operand::Raw(expr)
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(SqlValue::from(v))
                }
            }
        )+
    };
}

operand_from_value!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    String,
    &str,
    Vec<u8>,
    Uuid,
    DateTime<Utc>,
    NaiveDate,
    NaiveTime,
    serde_json::Value,
);

impl From<SqlValue> for Operand {
    fn from(v: SqlValue) -> Self {
        Operand::Value(v)
    }
}

/// Rendered clause plus its ordered bind values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    /// `None` for an empty filter (see the module docs)
    pub clause: Option<String>,
    pub bind_values: Vec<SqlValue>,
}

impl Rendered {
    pub fn new(clause: impl Into<String>, bind_values: Vec<SqlValue>) -> Self {
        Self {
            clause: Some(clause.into()),
            bind_values,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_none()
    }

    /// `" WHERE <clause>"`, or an empty string when there is no filter
    pub fn where_clause(&self) -> String {
        match &self.clause {
            Some(clause) => format!(" WHERE {}", clause),
            None => String::new(),
        }
    }
}

/// Boolean combinator over child filters
#[derive(Debug, Clone, PartialEq)]
pub struct Combine {
    operator: String,
    default_operator: &'static str,
    children: Vec<Filter>,
    vendor: DatabaseVendor,
}

impl Combine {
    fn with_default(default_operator: &'static str) -> Self {
        Self {
            operator: default_operator.to_string(),
            default_operator,
            children: Vec::new(),
            vendor: DatabaseVendor::Unknown,
        }
    }

    /// AND-flavored combinator
    pub fn and() -> Self {
        Self::with_default("AND")
    }

    /// OR-flavored combinator
    pub fn or() -> Self {
        Self::with_default("OR")
    }

    /// Combinator with a caller-supplied boolean operator (blank means AND)
    pub fn new(operator: &str) -> Self {
        Self::and().with_operator(operator)
    }

    /// Replace the operator; a blank operator falls back to the default
    pub fn with_operator(mut self, operator: &str) -> Self {
        let operator = operator.trim();
        self.operator = if operator.is_empty() {
            self.default_operator.to_string()
        } else {
            operator.to_string()
        };
        self
    }

    pub fn with_vendor(mut self, vendor: DatabaseVendor) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn add(mut self, filter: Filter) -> Self {
        self.children.push(filter);
        self
    }

    pub fn add_all(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.children.extend(filters);
        self
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn vendor(&self) -> DatabaseVendor {
        self.vendor
    }

    pub fn children(&self) -> &[Filter] {
        &self.children
    }

    fn render(&self) -> Rendered {
        let mut parts = Vec::with_capacity(self.children.len());
        let mut bind_values = Vec::new();

        for child in &self.children {
            let rendered = child.render();
            // Nested empty combinators contribute nothing
            if let Some(clause) = rendered.clause {
                parts.push(format!("({})", clause));
                bind_values.extend(rendered.bind_values);
            }
        }

        if parts.is_empty() {
            return Rendered::empty();
        }

        let separator = format!(" {} ", self.operator);
        Rendered::new(parts.join(&separator), bind_values)
    }
}

impl From<Combine> for Filter {
    fn from(combine: Combine) -> Self {
        Filter::Combine(combine)
    }
}

/// A node of the predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `<field> <operator> <value>`; the field name is embedded verbatim
    FieldValue {
        field: String,
        operator: String,
        value: Operand,
    },
    /// `<left> <operator> <right>`
    Expression {
        left: Operand,
        operator: String,
        right: Operand,
    },
    Combine(Combine),
}

impl Filter {
    /// `<field> <operator> <value>`
    ///
    /// `operator` is embedded verbatim, so the jsonb key-exists operator is
    /// written `"??"` (see [`RawExpression`]).
    pub fn field_value(
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Self {
        Filter::FieldValue {
            field: field.into(),
            operator: operator.trim().to_string(),
            value: value.into(),
        }
    }

    pub fn expression(
        left: impl Into<Operand>,
        operator: &str,
        right: impl Into<Operand>,
    ) -> Self {
        Filter::Expression {
            left: left.into(),
            operator: operator.trim().to_string(),
            right: right.into(),
        }
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::Combine(Combine::and().add_all(children))
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Combine(Combine::or().add_all(children))
    }

    pub fn combine(operator: &str, children: Vec<Filter>) -> Self {
        Filter::Combine(Combine::new(operator).add_all(children))
    }

    /// Render this node to clause text and ordered bind values
    pub fn render(&self) -> Rendered {
        match self {
            Filter::FieldValue {
                field,
                operator,
                value,
            } => {
                let mut clause = format!("{} {} ", field, operator);
                let mut bind_values = Vec::new();
                value.render_into(&mut clause, &mut bind_values);
                Rendered::new(clause, bind_values)
            }
            Filter::Expression {
                left,
                operator,
                right,
            } => {
                let mut clause = String::new();
                let mut bind_values = Vec::new();
                left.render_into(&mut clause, &mut bind_values);
                clause.push(' ');
                clause.push_str(operator);
                clause.push(' ');
                right.render_into(&mut clause, &mut bind_values);
                Rendered::new(clause, bind_values)
            }
            Filter::Combine(combine) => combine.render(),
        }
    }

    /// Number of bind values this node renders
    pub fn placeholder_count(&self) -> usize {
        match self {
            Filter::FieldValue { value, .. } => usize::from(matches!(value, Operand::Value(_))),
            Filter::Expression { left, right, .. } => {
                usize::from(matches!(left, Operand::Value(_)))
                    + usize::from(matches!(right, Operand::Value(_)))
            }
            Filter::Combine(combine) => combine.children.iter().map(Filter::placeholder_count).sum(),
        }
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

/// `field = value`
pub fn eq(field: impl Into<String>, value: impl Into<Operand>) -> Filter {
    Filter::field_value(field, "=", value)
}

/// `field <> value`
pub fn ne(field: impl Into<String>, value: impl Into<Operand>) -> Filter {
    Filter::field_value(field, "<>", value)
}

/// `field > value`
pub fn gt(field: impl Into<String>, value: impl Into<Operand>) -> Filter {
    Filter::field_value(field, ">", value)
}

/// `field >= value`
pub fn gte(field: impl Into<String>, value: impl Into<Operand>) -> Filter {
    Filter::field_value(field, ">=", value)
}

/// `field < value`
pub fn lt(field: impl Into<String>, value: impl Into<Operand>) -> Filter {
    Filter::field_value(field, "<", value)
}

/// `field <= value`
pub fn lte(field: impl Into<String>, value: impl Into<Operand>) -> Filter {
    Filter::field_value(field, "<=", value)
}

/// `field LIKE pattern`
pub fn like(field: impl Into<String>, pattern: impl Into<Operand>) -> Filter {
    Filter::field_value(field, "LIKE", pattern)
}

/// `field IS NULL`
pub fn is_null(field: impl Into<String>) -> Filter {
    Filter::field_value(field, "IS", RawExpression::new("NULL"))
}

/// `field IS NOT NULL`
pub fn is_not_null(field: impl Into<String>) -> Filter {
    Filter::field_value(field, "IS NOT", RawExpression::new("NULL"))
}
