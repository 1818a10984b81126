//! Check execution

use crate::check::{rounded_eq, violations, Check, CheckKind};
use bn_core::ScalarQuery;
use bn_db::{Database, DbResult};
use std::fmt;
use std::time::{Duration, Instant};

/// Result of a single check
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Check name
    pub name: String,

    /// Table checked
    pub table: String,

    /// Whether the check passed
    pub passed: bool,

    /// What was expected
    pub expected: String,

    /// What was observed
    pub actual: String,

    /// Execution time
    pub duration: Duration,

    /// Error message if the check could not be evaluated
    pub error: Option<String>,
}

impl CheckResult {
    fn evaluated(check: &Check, passed: bool, actual: String, duration: Duration) -> Self {
        Self {
            name: check.name.clone(),
            table: check.table.to_string(),
            passed,
            expected: check.describe(),
            actual,
            duration,
            error: None,
        }
    }

    fn error(check: &Check, error: String, duration: Duration) -> Self {
        Self {
            name: check.name.clone(),
            table: check.table.to_string(),
            passed: false,
            expected: check.describe(),
            actual: String::new(),
            duration,
            error: Some(error),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.passed) {
            (Some(e), _) => write!(f, "{}: error: {}", self.name, e),
            (None, true) => write!(f, "{}: ok ({})", self.name, self.actual),
            (None, false) => write!(
                f,
                "{}: expected {}, got {}",
                self.name, self.expected, self.actual
            ),
        }
    }
}

/// Summary of a check run
#[derive(Debug, Clone)]
pub struct CheckSummary {
    /// Total checks run
    pub total: usize,

    /// Checks passed
    pub passed: usize,

    /// Checks failed
    pub failed: usize,

    /// Checks that could not be evaluated
    pub errors: usize,

    /// Total execution time
    pub duration: Duration,

    /// One line per failed or errored check
    pub failures: Vec<String>,
}

impl CheckSummary {
    /// Create a summary from check results
    pub fn from_results(results: &[CheckResult], duration: Duration) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let errors = results.iter().filter(|r| r.error.is_some()).count();
        let failed = results
            .iter()
            .filter(|r| !r.passed && r.error.is_none())
            .count();
        let failures = results
            .iter()
            .filter(|r| !r.passed)
            .map(ToString::to_string)
            .collect();

        Self {
            total,
            passed,
            failed,
            errors,
            duration,
            failures,
        }
    }

    /// Check if every check passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errors",
            self.passed, self.failed, self.errors
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

/// Check runner for executing post-conditions
pub struct CheckRunner<'a> {
    db: &'a dyn Database,
}

impl<'a> CheckRunner<'a> {
    /// Create a new check runner
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Run a single check
    pub async fn run_check(&self, check: &Check) -> CheckResult {
        let start = Instant::now();
        let result = match self.evaluate(check).await {
            Ok((passed, actual)) => {
                CheckResult::evaluated(check, passed, actual, start.elapsed())
            }
            Err(e) => CheckResult::error(check, e.to_string(), start.elapsed()),
        };

        if result.passed {
            log::info!("check {} passed ({})", result.name, result.actual);
        } else {
            log::warn!("check {}", result);
        }
        result
    }

    async fn evaluate(&self, check: &Check) -> DbResult<(bool, String)> {
        match &check.kind {
            CheckKind::NotEmpty => {
                let rows = self.db.row_count(&check.table).await?;
                Ok((rows > 0, format!("{} rows", rows)))
            }
            CheckKind::RowCount(expected) => {
                let rows = self.db.row_count(&check.table).await?;
                Ok((rows == *expected, format!("{} rows", rows)))
            }
            CheckKind::RowCountMatches(query) => {
                let rows = self.db.row_count(&check.table).await?;
                let reference = self.db.scalar_i64(query).await?;
                Ok((
                    i64::try_from(rows).is_ok_and(|r| r == reference),
                    format!("{} rows, reference {}", rows, reference),
                ))
            }
            CheckKind::Unique(column) => {
                let rows = self.db.row_count(&check.table).await?;
                let distinct = self
                    .db
                    .scalar_i64(&ScalarQuery::count_distinct(&check.table, column))
                    .await?;
                Ok((
                    i64::try_from(rows).is_ok_and(|r| r == distinct),
                    format!("{} rows, {} distinct", rows, distinct),
                ))
            }
            CheckKind::ColumnsPresent(columns) => {
                let present = self.db.column_names(&check.table).await?;
                let missing: Vec<&str> = columns
                    .iter()
                    .filter(|c| !present.contains(c))
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    Ok((true, "all present".to_string()))
                } else {
                    Ok((false, format!("missing [{}]", missing.join(", "))))
                }
            }
            CheckKind::ValueEquals {
                query,
                expected,
                decimals,
            } => match self.db.scalar_f64(query).await? {
                Some(value) => Ok((
                    rounded_eq(value, *expected, *decimals),
                    format!("{:.*}", *decimals as usize, value),
                )),
                None => Ok((false, "NULL".to_string())),
            },
            CheckKind::ValuesMatch {
                left,
                right,
                decimals,
            } => {
                let l = self.db.scalar_f64(left).await?;
                let r = self.db.scalar_f64(right).await?;
                let d = *decimals as usize;
                match (l, r) {
                    (Some(l), Some(r)) => Ok((
                        rounded_eq(l, r, *decimals),
                        format!("{:.*} vs {:.*}", d, l, d, r),
                    )),
                    (l, r) => Ok((false, format!("{:?} vs {:?}", l, r))),
                }
            }
            CheckKind::AllSatisfy(rule) => {
                let broken = self.db.scalar_i64(&violations(&check.table, rule)).await?;
                Ok((broken == 0, format!("{} violating rows", broken)))
            }
        }
    }

    /// Run multiple checks in order
    pub async fn run_checks(&self, checks: &[Check]) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(checks.len());

        for check in checks {
            let result = self.run_check(check).await;
            results.push(result);
        }

        results
    }

    /// Run all checks and return summary
    pub async fn run_all(&self, checks: &[Check]) -> (Vec<CheckResult>, CheckSummary) {
        let start = Instant::now();
        let results = self.run_checks(checks).await;
        let duration = start.elapsed();
        let summary = CheckSummary::from_results(&results, duration);

        (results, summary)
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
