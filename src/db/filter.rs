// src/db/filter.rs

use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// Where a queryable field lives in a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    Id,
    CreatedAt,
    UpdatedAt,
    /// Top-level key inside the JSON document.
    Doc(&'static str),
}

impl FieldPath {
    fn push_expr(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FieldPath::Id => qb.push("id"),
            FieldPath::CreatedAt => qb.push("created_at"),
            FieldPath::UpdatedAt => qb.push("updated_at"),
            FieldPath::Doc(key) => qb.push(format_args!("json_extract(doc, '$.{}')", key)),
        };
    }
}

/// A closed set of queryable fields for one document type.
pub trait Field: Copy + Send + Sync + fmt::Debug + 'static {
    fn path(self) -> FieldPath;
}

/// Scalar operand of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Time(DateTime<Utc>),
}

impl Value {
    fn push_bind(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Value::Null => qb.push("NULL"),
            Value::Bool(b) => qb.push_bind(*b),
            Value::Int(i) => qb.push_bind(*i),
            Value::Float(f) => qb.push_bind(*f),
            Value::Text(s) => qb.push_bind(s.clone()),
            Value::Time(t) => qb.push_bind(*t),
        };
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Typed filter predicate over the fields `F` of one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<F> {
    /// Matches every record.
    All,
    Eq(F, Value),
    /// Also matches records where the field is missing.
    Ne(F, Value),
    Gt(F, Value),
    Gte(F, Value),
    Lt(F, Value),
    Lte(F, Value),
    In(F, Vec<Value>),
    /// Array field contains the element.
    Has(F, Value),
    /// Case-insensitive substring match on a text field.
    Contains(F, String),
    And(Vec<Filter<F>>),
    Or(Vec<Filter<F>>),
    Not(Box<Filter<F>>),
}

impl<F> Default for Filter<F> {
    fn default() -> Self {
        Filter::All
    }
}

impl<F: Field> Filter<F> {
    pub fn eq(field: F, value: impl Into<Value>) -> Self {
        Filter::Eq(field, value.into())
    }

    pub fn ne(field: F, value: impl Into<Value>) -> Self {
        Filter::Ne(field, value.into())
    }

    pub fn has(field: F, value: impl Into<Value>) -> Self {
        Filter::Has(field, value.into())
    }

    pub fn contains(field: F, needle: impl Into<String>) -> Self {
        Filter::Contains(field, needle.into())
    }

    pub fn any_of<V: Into<Value>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn and(self, other: Filter<F>) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            this => Filter::And(vec![this, other]),
        }
    }

    /// Renders the predicate as a SQL boolean expression.
    pub(crate) fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Filter::All => {
                qb.push("1 = 1");
            }
            Filter::Eq(field, Value::Null) => {
                field.path().push_expr(qb);
                qb.push(" IS NULL");
            }
            Filter::Eq(field, value) => push_cmp(qb, *field, "=", value),
            Filter::Ne(field, Value::Null) => {
                field.path().push_expr(qb);
                qb.push(" IS NOT NULL");
            }
            Filter::Ne(field, value) => {
                qb.push("(");
                field.path().push_expr(qb);
                qb.push(" IS NULL OR ");
                push_cmp(qb, *field, "<>", value);
                qb.push(")");
            }
            Filter::Gt(field, value) => push_cmp(qb, *field, ">", value),
            Filter::Gte(field, value) => push_cmp(qb, *field, ">=", value),
            Filter::Lt(field, value) => push_cmp(qb, *field, "<", value),
            Filter::Lte(field, value) => push_cmp(qb, *field, "<=", value),
            Filter::In(_, values) if values.is_empty() => {
                qb.push("1 = 0");
            }
            Filter::In(field, values) => {
                field.path().push_expr(qb);
                qb.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    value.push_bind(qb);
                }
                qb.push(")");
            }
            Filter::Has(field, value) => match field.path() {
                FieldPath::Doc(key) => {
                    qb.push(format_args!(
                        "EXISTS (SELECT 1 FROM json_each(doc, '$.{}') WHERE json_each.value = ",
                        key
                    ));
                    value.push_bind(qb);
                    qb.push(")");
                }
                _ => push_cmp(qb, *field, "=", value),
            },
            Filter::Contains(field, needle) => {
                field.path().push_expr(qb);
                qb.push(" LIKE ");
                qb.push_bind(format!("%{}%", escape_like(needle)));
                qb.push(" ESCAPE '\\'");
            }
            Filter::And(parts) => push_joined(qb, parts, " AND ", "1 = 1"),
            Filter::Or(parts) => push_joined(qb, parts, " OR ", "1 = 0"),
            Filter::Not(inner) => {
                qb.push("NOT (");
                inner.push_sql(qb);
                qb.push(")");
            }
        }
    }
}

fn push_cmp<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, field: F, op: &str, value: &Value) {
    field.path().push_expr(qb);
    qb.push(format_args!(" {} ", op));
    value.push_bind(qb);
}

fn push_joined<F: Field>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    parts: &[Filter<F>],
    sep: &str,
    empty: &str,
) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(sep);
        }
        part.push_sql(qb);
    }
    qb.push(")");
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// One sort key. `Sort::desc(Field::CreatedAt)` is the usual newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub order: Order,
}

impl<F: Field> Sort<F> {
    pub fn asc(field: F) -> Self {
        Self { field, order: Order::Asc }
    }

    pub fn desc(field: F) -> Self {
        Self { field, order: Order::Desc }
    }
}

/// Renders an ORDER BY clause. The record id always closes the list so
/// records with equal keys come back in a stable order.
pub(crate) fn push_order_by<F: Field>(qb: &mut QueryBuilder<'_, Sqlite>, sort: &[Sort<F>]) {
    qb.push(" ORDER BY ");
    for key in sort {
        key.field.path().push_expr(qb);
        qb.push(format_args!(" {}, ", key.order.as_sql()));
    }
    let tie = sort.first().map(|s| s.order).unwrap_or(Order::Asc);
    qb.push(format_args!("id {}", tie.as_sql()));
}
