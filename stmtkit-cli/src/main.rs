//! `stmtkit`: run, step through and explain `SQLite` prepared statements.

mod args;
mod commands;
mod literal;
mod render;

use clap::Parser;
use eyre::{Result, WrapErr};
use stmtkit_db::Connection;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let conn = Connection::open(&cli.db, cli.read_only)
        .wrap_err_with(|| format!("failed to open {}", cli.db.display()))?;
    if let Some(init) = &cli.init {
        conn.execute_batch(init).wrap_err("init script failed")?;
    }
    tracing::debug!(db = %cli.db.display(), "database ready");

    let mut out = std::io::stdout().lock();
    match &cli.command {
        Command::Query {
            sql,
            params,
            format,
            header,
        } => commands::query(&conn, sql, params, *format, *header, &mut out).map(|_| ()),
        Command::Exec { sql, params } => commands::exec(&conn, sql, params, &mut out),
        Command::Explain { sql } => commands::explain(&conn, sql, &mut out),
    }
}
