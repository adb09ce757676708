//! Command implementations, writing to any [`Write`] sink.

use std::io::Write;

use eyre::{Result, WrapErr};
use stmtkit_db::{Connection, StepResult, Value};

use crate::args::Format;
use crate::render;

pub(crate) fn query(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    format: Format,
    header: bool,
    out: &mut impl Write,
) -> Result<usize> {
    let mut stmt = conn.prepare(sql).wrap_err("failed to prepare query")?;
    stmt.bind_values(params).wrap_err("failed to bind parameters")?;
    let columns: Vec<String> = (0..stmt.column_count())
        .map(|i| stmt.column_name(i).unwrap_or_default().to_string())
        .collect();
    if header && format == Format::Plain {
        writeln!(out, "{}", columns.join("|"))?;
    }

    let mut rows = 0;
    while stmt.step().wrap_err("query failed")? == StepResult::Row {
        let values: Vec<Value> = (0..columns.len()).map(|i| stmt.view_value(i)).collect();
        match format {
            Format::Plain => writeln!(out, "{}", render::plain_row(&values))?,
            Format::Json => writeln!(out, "{}", render::json_row(&columns, &values))?,
        }
        rows += 1;
    }
    tracing::debug!(rows, "query finished");
    Ok(rows)
}

pub(crate) fn exec(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    out: &mut impl Write,
) -> Result<()> {
    let changed = conn.execute(sql, params).wrap_err("statement failed")?;
    writeln!(out, "{changed}")?;
    Ok(())
}

pub(crate) fn explain(conn: &Connection, sql: &str, out: &mut impl Write) -> Result<()> {
    let stmt = conn.prepare(sql).wrap_err("failed to prepare statement")?;
    let plan = stmt.explain().wrap_err("failed to explain statement")?;
    writeln!(out, "{plan}")?;
    Ok(())
}
