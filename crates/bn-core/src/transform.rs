//! Declarative transforms over the tabular store.
//!
//! Stages describe what they want (filter, group-by aggregation, ranked
//! window, equi-join, projection) as plain data. The store backend owns the
//! translation to its own SQL dialect, so stage logic never embeds query
//! text and the backend can be swapped without touching it.

use crate::error::{CoreError, CoreResult};
use crate::table_name::TableName;
use serde::Serialize;
use std::path::PathBuf;

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
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

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Scalar expression evaluated per row
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Unqualified column reference
    Column(String),
    /// Column of a named join input (`alias.column`)
    Qualified { relation: String, column: String },
    Literal(Value),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Round { expr: Box<Expr>, decimals: u32 },
    Case {
        when: Box<Predicate>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn qcol(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Qualified {
            relation: relation.into(),
            column: column.into(),
        }
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    fn binary(self, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn add(self, right: Expr) -> Self {
        self.binary(BinaryOp::Add, right)
    }

    pub fn sub(self, right: Expr) -> Self {
        self.binary(BinaryOp::Sub, right)
    }

    pub fn mul(self, right: Expr) -> Self {
        self.binary(BinaryOp::Mul, right)
    }

    pub fn div(self, right: Expr) -> Self {
        self.binary(BinaryOp::Div, right)
    }

    pub fn round(self, decimals: u32) -> Self {
        Expr::Round {
            expr: Box::new(self),
            decimals,
        }
    }

    pub fn case(when: Predicate, then: Expr, otherwise: Expr) -> Self {
        Expr::Case {
            when: Box::new(when),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    fn validate(&self) -> CoreResult<()> {
        match self {
            Expr::Column(name) | Expr::Qualified { column: name, .. } if name.is_empty() => {
                Err(invalid("empty column name"))
            }
            Expr::Qualified { relation, .. } if relation.is_empty() => {
                Err(invalid("empty relation alias"))
            }
            Expr::Column(_) | Expr::Qualified { .. } => Ok(()),
            Expr::Literal(Value::Float(f)) if !f.is_finite() => {
                Err(invalid(&format!("non-finite literal {f}")))
            }
            Expr::Literal(_) => Ok(()),
            Expr::Binary { left, right, .. } => {
                left.validate()?;
                right.validate()
            }
            Expr::Round { expr, .. } => expr.validate(),
            Expr::Case {
                when,
                then,
                otherwise,
            } => {
                when.validate()?;
                then.validate()?;
                otherwise.validate()
            }
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsNull(Expr),
    IsNotNull(Expr),
    Compare {
        left: Expr,
        op: CompareOp,
        right: Expr,
    },
    /// Value is neither NaN nor infinite
    IsFinite(Expr),
    /// `expr IN (SELECT column FROM table)`
    InTable {
        expr: Expr,
        table: TableName,
        column: String,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Row is not known to satisfy the inner predicate: an unknown (NULL)
    /// outcome counts as "not satisfied", so negating a validity rule
    /// selects every row that breaks it.
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn not_null(column: &str) -> Self {
        Predicate::IsNotNull(Expr::col(column))
    }

    pub fn is_null(column: &str) -> Self {
        Predicate::IsNull(Expr::col(column))
    }

    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Predicate::Compare { left, op, right }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(Expr::col(column), CompareOp::Eq, Expr::lit(value))
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(Expr::col(column), CompareOp::Gt, Expr::lit(value))
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(Expr::col(column), CompareOp::Lt, Expr::lit(value))
    }

    pub fn finite(column: &str) -> Self {
        Predicate::IsFinite(Expr::col(column))
    }

    pub fn in_table(column: &str, table: TableName, table_column: &str) -> Self {
        Predicate::InTable {
            expr: Expr::col(column),
            table,
            column: table_column.to_string(),
        }
    }

    pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(preds.into_iter().collect())
    }

    /// Every listed column is non-null
    pub fn all_not_null(columns: &[&str]) -> Self {
        Predicate::And(columns.iter().map(|c| Self::not_null(c)).collect())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut preds) => {
                preds.push(other);
                Predicate::And(preds)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    fn validate(&self) -> CoreResult<()> {
        match self {
            Predicate::IsNull(e) | Predicate::IsNotNull(e) | Predicate::IsFinite(e) => {
                e.validate()
            }
            Predicate::Compare { left, right, .. } => {
                left.validate()?;
                right.validate()
            }
            Predicate::InTable { expr, column, .. } => {
                if column.is_empty() {
                    return Err(invalid("IN (SELECT ...) needs a column"));
                }
                expr.validate()
            }
            Predicate::And(preds) | Predicate::Or(preds) => {
                if preds.is_empty() {
                    return Err(invalid("empty AND/OR"));
                }
                preds.iter().try_for_each(Predicate::validate)
            }
            Predicate::Not(p) => p.validate(),
        }
    }
}

/// Where rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table(TableName),
    /// A CSV file read with type inference
    Csv(PathBuf),
}

impl From<TableName> for Source {
    fn from(t: TableName) -> Self {
        Source::Table(t)
    }
}

impl From<&TableName> for Source {
    fn from(t: &TableName) -> Self {
        Source::Table(t.clone())
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Max,
    Min,
    Sum,
    Count,
    CountDistinct,
    Avg,
    StddevPop,
    StddevSamp,
}

/// One aggregated output column
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub func: AggFunc,
    pub expr: Expr,
    pub alias: String,
}

impl Aggregate {
    /// `FUNC(column) AS column`, the common reconciliation shape
    pub fn same_name(func: AggFunc, column: &str) -> Self {
        Self {
            func,
            expr: Expr::col(column),
            alias: column.to_string(),
        }
    }

    pub fn new(func: AggFunc, expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            func,
            expr,
            alias: alias.into(),
        }
    }
}

/// Output column of a projection
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Projection {
    pub fn column(name: &str) -> Self {
        Self {
            expr: Expr::col(name),
            alias: None,
        }
    }

    pub fn qualified(relation: &str, column: &str) -> Self {
        Self {
            expr: Expr::qcol(relation, column),
            alias: None,
        }
    }

    pub fn named(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(column: &str) -> Self {
        Self {
            expr: Expr::col(column),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            expr: Expr::col(column),
            descending: true,
        }
    }
}

/// A table participating in a join, with the alias its columns are qualified by
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInput {
    pub table: TableName,
    pub alias: String,
}

impl JoinInput {
    pub fn new(table: TableName, alias: &str) -> Self {
        Self {
            table,
            alias: alias.to_string(),
        }
    }
}

/// Inner equi-join step: `JOIN input ON left = right`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub input: JoinInput,
    pub left: Expr,
    pub right: Expr,
}

/// A declarative table-producing transform
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Rows of `source` satisfying `predicate`, all columns kept
    Filter { source: Source, predicate: Predicate },

    /// One row per distinct `group_by` tuple
    Aggregate {
        source: Source,
        filter: Option<Predicate>,
        group_by: Vec<String>,
        aggregates: Vec<Aggregate>,
    },

    /// Keep the first `keep` rows of every partition, ordered by `order_by`.
    /// Ties are broken by the backend's row numbering, never duplicated.
    Rank {
        source: Source,
        filter: Option<Predicate>,
        partition_by: Vec<String>,
        order_by: Vec<OrderKey>,
        keep: u64,
    },

    /// Chain of inner equi-joins starting at `base`
    Join {
        base: JoinInput,
        joins: Vec<JoinClause>,
        columns: Vec<Projection>,
    },

    /// Computed columns over `source`
    Project {
        source: Source,
        columns: Vec<Projection>,
        filter: Option<Predicate>,
        order_by: Vec<OrderKey>,
    },

    /// Literal rows
    Values {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
}

impl Transform {
    /// Check structural well-formedness before handing the transform to a backend.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Transform::Filter { predicate, .. } => predicate.validate(),
            Transform::Aggregate {
                filter,
                group_by,
                aggregates,
                ..
            } => {
                if aggregates.is_empty() {
                    return Err(invalid("aggregate transform without aggregates"));
                }
                if group_by.iter().any(String::is_empty) {
                    return Err(invalid("empty group-by column"));
                }
                for agg in aggregates {
                    if agg.alias.is_empty() {
                        return Err(invalid("aggregate without alias"));
                    }
                    agg.expr.validate()?;
                }
                validate_filter(filter)
            }
            Transform::Rank {
                filter,
                partition_by,
                order_by,
                keep,
                ..
            } => {
                if partition_by.is_empty() {
                    return Err(invalid("rank transform needs a partition key"));
                }
                if order_by.is_empty() {
                    return Err(invalid("rank transform needs an ordering"));
                }
                if *keep == 0 {
                    return Err(invalid("rank transform must keep at least one row"));
                }
                order_by.iter().try_for_each(|k| k.expr.validate())?;
                validate_filter(filter)
            }
            Transform::Join {
                base,
                joins,
                columns,
            } => {
                if joins.is_empty() {
                    return Err(invalid("join transform needs at least one join"));
                }
                if columns.is_empty() {
                    return Err(invalid("join transform selects no columns"));
                }
                let mut aliases = vec![base.alias.as_str()];
                for join in joins {
                    if aliases.contains(&join.input.alias.as_str()) {
                        return Err(invalid(&format!("duplicate alias '{}'", join.input.alias)));
                    }
                    aliases.push(&join.input.alias);
                    join.left.validate()?;
                    join.right.validate()?;
                }
                columns.iter().try_for_each(|c| c.expr.validate())
            }
            Transform::Project {
                columns,
                filter,
                order_by,
                ..
            } => {
                if columns.is_empty() {
                    return Err(invalid("projection selects no columns"));
                }
                columns.iter().try_for_each(|c| c.expr.validate())?;
                order_by.iter().try_for_each(|k| k.expr.validate())?;
                validate_filter(filter)
            }
            Transform::Values { columns, rows } => {
                if columns.is_empty() {
                    return Err(invalid("values transform has no columns"));
                }
                if rows.is_empty() {
                    return Err(invalid("values transform has no rows"));
                }
                for (i, row) in rows.iter().enumerate() {
                    if row.len() != columns.len() {
                        return Err(invalid(&format!(
                            "row {} has {} values, expected {}",
                            i,
                            row.len(),
                            columns.len()
                        )));
                    }
                    for value in row {
                        Expr::Literal(value.clone()).validate()?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn validate_filter(filter: &Option<Predicate>) -> CoreResult<()> {
    filter.as_ref().map_or(Ok(()), Predicate::validate)
}

fn invalid(message: &str) -> CoreError {
    CoreError::InvalidTransform {
        message: message.to_string(),
    }
}

/// A query producing a single value
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarQuery {
    /// Number of rows, optionally restricted by a predicate
    Count {
        source: Source,
        filter: Option<Predicate>,
    },
    /// One aggregate over the whole source
    Aggregate {
        source: Source,
        func: AggFunc,
        expr: Expr,
        filter: Option<Predicate>,
    },
}

impl ScalarQuery {
    pub fn count(source: impl Into<Source>) -> Self {
        ScalarQuery::Count {
            source: source.into(),
            filter: None,
        }
    }

    pub fn count_where(source: impl Into<Source>, predicate: Predicate) -> Self {
        ScalarQuery::Count {
            source: source.into(),
            filter: Some(predicate),
        }
    }

    pub fn count_distinct(source: impl Into<Source>, column: &str) -> Self {
        Self::aggregate(source, AggFunc::CountDistinct, Expr::col(column))
    }

    pub fn aggregate(source: impl Into<Source>, func: AggFunc, expr: Expr) -> Self {
        ScalarQuery::Aggregate {
            source: source.into(),
            func,
            expr,
            filter: None,
        }
    }

    pub fn with_filter(self, predicate: Predicate) -> Self {
        match self {
            ScalarQuery::Count { source, .. } => ScalarQuery::Count {
                source,
                filter: Some(predicate),
            },
            ScalarQuery::Aggregate {
                source, func, expr, ..
            } => ScalarQuery::Aggregate {
                source,
                func,
                expr,
                filter: Some(predicate),
            },
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        match self {
            ScalarQuery::Count { filter, .. } => validate_filter(filter),
            ScalarQuery::Aggregate { expr, filter, .. } => {
                expr.validate()?;
                validate_filter(filter)
            }
        }
    }
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
