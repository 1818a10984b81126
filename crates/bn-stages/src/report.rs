//! Final audit report: actual counts of every stage next to the expected
//! values of the reference dataset

use crate::context::StageContext;
use crate::error::{StageError, StageResult};
use crate::revenue::{self, TOTAL_COLUMN};
use crate::tables::{self, Feed};
use crate::transfer;
use bn_check::Check;
use bn_core::{AggFunc, Config, Expr, ScalarQuery, Source, TableName, Transform, Value};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STAGE: &str = "report";

/// Report columns, in table order
pub const COLUMNS: [&str; 4] = ["step", "actual", "expected", "status"];

/// One audited figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub step: String,
    pub actual: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl ReportRow {
    fn count(step: impl Into<String>, actual: u64, expected: Option<u64>) -> Self {
        Self {
            step: step.into(),
            actual: actual.to_string(),
            expected: expected.map(|e| e.to_string()),
        }
    }

    fn amount(step: impl Into<String>, actual: f64, expected: Option<f64>) -> Self {
        Self {
            step: step.into(),
            actual: format!("{:.2}", actual),
            expected: expected.map(|e| format!("{:.2}", e)),
        }
    }

    /// `None` when nothing is expected
    pub fn matches(&self) -> Option<bool> {
        self.expected.as_ref().map(|e| *e == self.actual)
    }

    pub fn status(&self) -> &'static str {
        match self.matches() {
            Some(true) => "ok",
            Some(false) => "mismatch",
            None => "",
        }
    }
}

/// JSON form of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub pipeline: String,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn mismatches(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| r.matches() == Some(false))
    }
}

/// Files written and published by the report stage
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub report: Report,
    pub csv: PathBuf,
    pub xlsx: PathBuf,
    pub json: PathBuf,
}

async fn table_rows(ctx: &StageContext, table: &TableName) -> StageResult<u64> {
    Ok(ctx.db.row_count(table).await?)
}

/// Gather every figure from the persisted inputs and tables
pub async fn collect(ctx: &StageContext) -> StageResult<Vec<ReportRow>> {
    let expected = &ctx.config.expectations;
    let mut required: Vec<TableName> = Vec::new();
    for feed in Feed::ALL {
        required.push(feed.clean_table());
        required.push(feed.dedup_table());
    }
    required.extend([
        tables::fusion(),
        tables::revenue_per_product(),
        tables::revenue_total(),
        tables::vintage(),
    ]);
    ctx.require_tables(STAGE, &required).await?;

    let mut rows = Vec::new();

    // Raw files are counted where they live, not from the loaded tables.
    for feed in Feed::ALL {
        let path = ctx.input_path(&feed.file_name());
        ctx.require_file(STAGE, &path)?;
        let n = ctx
            .db
            .scalar_i64(&ScalarQuery::count(Source::Csv(path)))
            .await?;
        rows.push(ReportRow::count(
            format!("{} raw rows", feed.label()),
            u64::try_from(n).unwrap_or(0),
            None,
        ));
    }
    for feed in Feed::ALL {
        rows.push(ReportRow::count(
            format!("{} clean rows", feed.label()),
            table_rows(ctx, &feed.clean_table()).await?,
            None,
        ));
    }
    for (feed, want) in [
        (Feed::Erp, expected.erp_dedup_rows),
        (Feed::Web, expected.web_dedup_rows),
        (Feed::Liaison, expected.liaison_dedup_rows),
    ] {
        rows.push(ReportRow::count(
            format!("{} dedup rows", feed.label()),
            table_rows(ctx, &feed.dedup_table()).await?,
            want,
        ));
    }

    rows.push(ReportRow::count(
        "Fusion rows",
        table_rows(ctx, &tables::fusion()).await?,
        expected.fusion_rows,
    ));
    rows.push(ReportRow::count(
        "Revenue products",
        table_rows(ctx, &tables::revenue_per_product()).await?,
        expected.revenue_rows,
    ));

    let total = ctx
        .db
        .scalar_f64(&ScalarQuery::aggregate(
            &tables::revenue_total(),
            AggFunc::Max,
            Expr::col(TOTAL_COLUMN),
        ))
        .await?
        .ok_or_else(|| StageError::EmptyInput {
            stage: STAGE.to_string(),
            table: tables::revenue_total().to_string(),
        })?;
    rows.push(ReportRow::amount(
        "Revenue total",
        revenue::round_cents(total),
        expected.revenue_total.map(revenue::round_cents),
    ));

    rows.push(ReportRow::count(
        "Vintage wines",
        table_rows(ctx, &tables::vintage()).await?,
        expected.vintage_rows,
    ));
    Ok(rows)
}

fn report_transform(rows: &[ReportRow]) -> Transform {
    Transform::Values {
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    Value::from(r.step.as_str()),
                    Value::from(r.actual.as_str()),
                    Value::from(r.expected.as_deref().unwrap_or("")),
                    Value::from(r.status()),
                ]
            })
            .collect(),
    }
}

async fn ensure_parent(path: &Path) -> StageResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StageError::io(parent, e))?;
    }
    Ok(())
}

async fn write_json(path: &Path, report: &Report) -> StageResult<()> {
    ensure_parent(path).await?;
    let bytes = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| StageError::io(path, e))
}

/// One sheet: the header row then one line per figure
async fn write_xlsx(path: &Path, rows: &[ReportRow]) -> StageResult<()> {
    ensure_parent(path).await?;
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in (0u16..).zip(COLUMNS) {
        sheet.write_string(0, col, name)?;
    }
    for (line, row) in (1u32..).zip(rows) {
        let cells = [
            row.step.as_str(),
            row.actual.as_str(),
            row.expected.as_deref().unwrap_or(""),
            row.status(),
        ];
        for (col, cell) in (0u16..).zip(cells) {
            sheet.write_string(line, col, cell)?;
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Build `rapport_final`, write it as CSV, XLSX and JSON and publish all three.
///
/// Differences from the expected values are logged, not fatal: the
/// producing stages already enforce their oracles.
pub async fn run(ctx: &StageContext) -> StageResult<ReportOutput> {
    let rows = collect(ctx).await?;
    let table = tables::report();
    ctx.create(&table, &report_transform(&rows)).await?;

    let report = Report {
        pipeline: ctx.config.name.clone(),
        generated_at: Utc::now(),
        rows,
    };
    for row in report.mismatches() {
        log::warn!(
            "{}: actual {} differs from expected {}",
            row.step,
            row.actual,
            row.expected.as_deref().unwrap_or("")
        );
    }

    ctx.verify(STAGE, &checks(&ctx.config)).await?;

    let csv = ctx.export(&table).await?;
    let xlsx = ctx.output_path(&format!("{}.xlsx", table.table()));
    write_xlsx(&xlsx, &report.rows).await?;
    log::info!("wrote {}", xlsx.display());
    let json = ctx.output_path(&format!("{}.json", table.table()));
    write_json(&json, &report).await?;
    log::info!("wrote {}", json.display());

    transfer::upload_outputs(ctx, STAGE, &[csv.clone(), xlsx.clone(), json.clone()]).await?;
    Ok(ReportOutput {
        report,
        csv,
        xlsx,
        json,
    })
}

pub fn checks(_config: &Config) -> Vec<Check> {
    let table = tables::report();
    vec![
        Check::not_empty(&table),
        Check::columns_present(&table, &COLUMNS),
        Check::not_null(&table, &["step", "actual"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_status() {
        let row = ReportRow::count("Fusion rows", 714, Some(714));
        assert_eq!(row.status(), "ok");
        let row = ReportRow::count("Fusion rows", 713, Some(714));
        assert_eq!(row.matches(), Some(false));
        let row = ReportRow::count("ERP raw rows", 825, None);
        assert_eq!(row.status(), "");
    }

    #[test]
    fn test_amount_compares_on_cents() {
        let row = ReportRow::amount("Revenue total", 387837.6, Some(387837.60));
        assert_eq!(row.actual, "387837.60");
        assert_eq!(row.matches(), Some(true));
    }
}
