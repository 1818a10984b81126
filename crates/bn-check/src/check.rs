//! Check definitions and the scalar queries that evaluate them

use bn_core::{Predicate, ScalarQuery, TableName};

/// What a check asserts about its table
#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind {
    /// At least one row
    NotEmpty,

    /// Exactly this many rows
    RowCount(u64),

    /// Row count equals the value of another query
    RowCountMatches(ScalarQuery),

    /// `count(*) == count(distinct column)`
    Unique(String),

    /// No row violates the predicate (NULL outcomes count as violations)
    AllSatisfy(Predicate),

    /// Every listed column exists
    ColumnsPresent(Vec<String>),

    /// Query value equals `expected` once both are rounded to `decimals`
    ValueEquals {
        query: ScalarQuery,
        expected: f64,
        decimals: u32,
    },

    /// Two query values agree once rounded to `decimals`
    ValuesMatch {
        left: ScalarQuery,
        right: ScalarQuery,
        decimals: u32,
    },
}

/// A named post-condition over one table
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub name: String,
    pub table: TableName,
    pub kind: CheckKind,
}

impl Check {
    pub fn new(name: impl Into<String>, table: &TableName, kind: CheckKind) -> Self {
        Self {
            name: name.into(),
            table: table.clone(),
            kind,
        }
    }

    pub fn not_empty(table: &TableName) -> Self {
        Self::new(format!("not_empty_{}", table.table()), table, CheckKind::NotEmpty)
    }

    pub fn row_count(table: &TableName, expected: u64) -> Self {
        Self::new(
            format!("row_count_{}", table.table()),
            table,
            CheckKind::RowCount(expected),
        )
    }

    pub fn row_count_matches(name: &str, table: &TableName, query: ScalarQuery) -> Self {
        Self::new(name, table, CheckKind::RowCountMatches(query))
    }

    pub fn unique(table: &TableName, column: &str) -> Self {
        Self::new(
            format!("unique_{}_{}", table.table(), column),
            table,
            CheckKind::Unique(column.to_string()),
        )
    }

    pub fn all_satisfy(name: &str, table: &TableName, predicate: Predicate) -> Self {
        Self::new(name, table, CheckKind::AllSatisfy(predicate))
    }

    /// Every listed column is non-null
    pub fn not_null(table: &TableName, columns: &[&str]) -> Self {
        Self::all_satisfy(
            &format!("not_null_{}", table.table()),
            table,
            Predicate::all_not_null(columns),
        )
    }

    pub fn columns_present(table: &TableName, columns: &[&str]) -> Self {
        Self::new(
            format!("columns_{}", table.table()),
            table,
            CheckKind::ColumnsPresent(columns.iter().map(|c| c.to_string()).collect()),
        )
    }

    pub fn value_equals(
        name: &str,
        table: &TableName,
        query: ScalarQuery,
        expected: f64,
        decimals: u32,
    ) -> Self {
        Self::new(
            name,
            table,
            CheckKind::ValueEquals {
                query,
                expected,
                decimals,
            },
        )
    }

    pub fn values_match(
        name: &str,
        table: &TableName,
        left: ScalarQuery,
        right: ScalarQuery,
        decimals: u32,
    ) -> Self {
        Self::new(
            name,
            table,
            CheckKind::ValuesMatch {
                left,
                right,
                decimals,
            },
        )
    }

    /// Human-readable statement of what is expected
    pub fn describe(&self) -> String {
        match &self.kind {
            CheckKind::NotEmpty => format!("{} has rows", self.table),
            CheckKind::RowCount(n) => format!("{} has {} rows", self.table, n),
            CheckKind::RowCountMatches(_) => {
                format!("{} row count matches reference query", self.table)
            }
            CheckKind::Unique(column) => format!("{}.{} is unique", self.table, column),
            CheckKind::AllSatisfy(_) => format!("no row of {} violates the rule", self.table),
            CheckKind::ColumnsPresent(columns) => {
                format!("{} has columns [{}]", self.table, columns.join(", "))
            }
            CheckKind::ValueEquals {
                expected, decimals, ..
            } => format!("value equals {:.*}", *decimals as usize, expected),
            CheckKind::ValuesMatch { decimals, .. } => {
                format!("values agree to {} decimals", decimals)
            }
        }
    }
}

/// Query counting the rows of `table` that break `rule`
pub fn violations(table: &TableName, rule: &Predicate) -> ScalarQuery {
    ScalarQuery::count_where(table, rule.clone().negate())
}

/// Round both values to `decimals` places and compare
pub fn rounded_eq(a: f64, b: f64, decimals: u32) -> bool {
    let scale = 10f64.powi(decimals as i32);
    (a * scale).round() == (b * scale).round()
}
