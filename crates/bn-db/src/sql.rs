//! DuckDB SQL generation for declarative transforms
//!
//! Identifiers are always double-quoted and string literals escaped, so
//! names and values coming from configuration cannot change the shape of
//! the generated statement.

use bn_core::{
    AggFunc, BinaryOp, CompareOp, Expr, OrderKey, Predicate, Projection, ScalarQuery, Source,
    Transform, Value,
};

/// Helper column used by ranked transforms, dropped from the output
const RANK_COLUMN: &str = "__rank";

/// Quote a SQL identifier, doubling embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a potentially schema-qualified name (e.g. `schema.table`).
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a literal value
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        // Debug formatting keeps a decimal point or exponent; the cast stops
        // DuckDB from typing the literal as DECIMAL.
        Value::Float(f) => format!("CAST({:?} AS DOUBLE)", f),
        Value::Text(s) => format!("'{}'", escape_sql_string(s)),
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
    }
}

fn compare_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::NotEq => "<>",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
    }
}

/// Render a scalar expression
pub fn expr(e: &Expr) -> String {
    match e {
        Expr::Column(name) => quote_ident(name),
        Expr::Qualified { relation, column } => {
            format!("{}.{}", quote_ident(relation), quote_ident(column))
        }
        Expr::Literal(v) => literal(v),
        Expr::Binary { left, op, right } => {
            format!("({} {} {})", expr(left), binary_op(*op), expr(right))
        }
        Expr::Round { expr: inner, decimals } => format!("ROUND({}, {})", expr(inner), decimals),
        Expr::Case {
            when,
            then,
            otherwise,
        } => format!(
            "CASE WHEN {} THEN {} ELSE {} END",
            predicate(when),
            expr(then),
            expr(otherwise)
        ),
    }
}

/// Render a predicate
pub fn predicate(p: &Predicate) -> String {
    match p {
        Predicate::IsNull(e) => format!("{} IS NULL", expr(e)),
        Predicate::IsNotNull(e) => format!("{} IS NOT NULL", expr(e)),
        Predicate::Compare { left, op, right } => {
            format!("{} {} {}", expr(left), compare_op(*op), expr(right))
        }
        Predicate::IsFinite(e) => format!("isfinite(CAST({} AS DOUBLE))", expr(e)),
        Predicate::InTable {
            expr: e,
            table,
            column,
        } => format!(
            "{} IN (SELECT {} FROM {})",
            expr(e),
            quote_ident(column),
            quote_qualified(table)
        ),
        Predicate::And(preds) => join_predicates(preds, " AND "),
        Predicate::Or(preds) => join_predicates(preds, " OR "),
        Predicate::Not(inner) => format!("NOT COALESCE(({}), FALSE)", predicate(inner)),
    }
}

fn join_predicates(preds: &[Predicate], sep: &str) -> String {
    let parts: Vec<String> = preds.iter().map(predicate).collect();
    format!("({})", parts.join(sep))
}

/// Render a row source for a FROM clause
pub fn source(s: &Source) -> String {
    match s {
        Source::Table(t) => quote_qualified(t),
        Source::Csv(path) => format!(
            "read_csv_auto('{}')",
            escape_sql_string(&path.display().to_string())
        ),
    }
}

fn aggregate_call(func: AggFunc, arg: &Expr) -> String {
    let arg = expr(arg);
    match func {
        AggFunc::Max => format!("MAX({arg})"),
        AggFunc::Min => format!("MIN({arg})"),
        AggFunc::Sum => format!("SUM({arg})"),
        AggFunc::Count => format!("COUNT({arg})"),
        AggFunc::CountDistinct => format!("COUNT(DISTINCT {arg})"),
        AggFunc::Avg => format!("AVG({arg})"),
        AggFunc::StddevPop => format!("STDDEV_POP({arg})"),
        AggFunc::StddevSamp => format!("STDDEV_SAMP({arg})"),
    }
}

fn projection(p: &Projection) -> String {
    match &p.alias {
        Some(alias) => format!("{} AS {}", expr(&p.expr), quote_ident(alias)),
        None => expr(&p.expr),
    }
}

fn projections(columns: &[Projection]) -> String {
    columns.iter().map(projection).collect::<Vec<_>>().join(", ")
}

fn order_by(keys: &[OrderKey]) -> String {
    keys.iter()
        .map(|k| {
            if k.descending {
                format!("{} DESC", expr(&k.expr))
            } else {
                format!("{} ASC", expr(&k.expr))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn idents(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(filter: &Option<Predicate>) -> String {
    match filter {
        Some(p) => format!(" WHERE {}", predicate(p)),
        None => String::new(),
    }
}

/// Compile a transform into a SELECT statement.
///
/// Callers validate the transform first; compilation itself never fails.
pub fn select(t: &Transform) -> String {
    match t {
        Transform::Filter {
            source: src,
            predicate: p,
        } => format!("SELECT * FROM {} WHERE {}", source(src), predicate(p)),

        Transform::Aggregate {
            source: src,
            filter,
            group_by,
            aggregates,
        } => {
            let mut columns: Vec<String> = group_by.iter().map(|g| quote_ident(g)).collect();
            columns.extend(aggregates.iter().map(|a| {
                format!("{} AS {}", aggregate_call(a.func, &a.expr), quote_ident(&a.alias))
            }));
            let mut sql = format!(
                "SELECT {} FROM {}{}",
                columns.join(", "),
                source(src),
                where_clause(filter)
            );
            if !group_by.is_empty() {
                sql.push_str(&format!(" GROUP BY {}", idents(group_by)));
            }
            sql
        }

        Transform::Rank {
            source: src,
            filter,
            partition_by,
            order_by: keys,
            keep,
        } => {
            let rank = quote_ident(RANK_COLUMN);
            format!(
                "SELECT * EXCLUDE ({rank}) FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY {} ORDER BY {}) AS {rank} FROM {}{}) AS ranked WHERE {rank} <= {}",
                idents(partition_by),
                order_by(keys),
                source(src),
                where_clause(filter),
                keep
            )
        }

        Transform::Join {
            base,
            joins,
            columns,
        } => {
            let mut sql = format!(
                "SELECT {} FROM {} AS {}",
                projections(columns),
                quote_qualified(&base.table),
                quote_ident(&base.alias)
            );
            for join in joins {
                sql.push_str(&format!(
                    " JOIN {} AS {} ON {} = {}",
                    quote_qualified(&join.input.table),
                    quote_ident(&join.input.alias),
                    expr(&join.left),
                    expr(&join.right)
                ));
            }
            sql
        }

        Transform::Project {
            source: src,
            columns,
            filter,
            order_by: keys,
        } => {
            let mut sql = format!(
                "SELECT {} FROM {}{}",
                projections(columns),
                source(src),
                where_clause(filter)
            );
            if !keys.is_empty() {
                sql.push_str(&format!(" ORDER BY {}", order_by(keys)));
            }
            sql
        }

        Transform::Values { columns, rows } => {
            let rows: Vec<String> = rows
                .iter()
                .map(|row| {
                    let values: Vec<String> = row.iter().map(literal).collect();
                    format!("({})", values.join(", "))
                })
                .collect();
            format!(
                "SELECT * FROM (VALUES {}) AS v({})",
                rows.join(", "),
                idents(columns)
            )
        }
    }
}

/// Compile a scalar query into a single-column, single-row SELECT
pub fn scalar(q: &ScalarQuery) -> String {
    match q {
        ScalarQuery::Count {
            source: src,
            filter,
        } => format!("SELECT COUNT(*) FROM {}{}", source(src), where_clause(filter)),
        ScalarQuery::Aggregate {
            source: src,
            func,
            expr: e,
            filter,
        } => format!(
            "SELECT {} FROM {}{}",
            aggregate_call(*func, e),
            source(src),
            where_clause(filter)
        ),
    }
}

/// Wrap a scalar SELECT so its single value is cast to `sql_type`
pub fn cast_scalar(inner: &str, sql_type: &str) -> String {
    format!("SELECT CAST(v AS {sql_type}) FROM ({inner}) AS q(v)")
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod tests;
