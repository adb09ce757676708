//! Command-line arguments and their environment fallbacks.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use stmtkit_db::Value;

use crate::literal;

#[derive(Debug, Parser)]
#[command(
    name = "stmtkit",
    author,
    version,
    about = "Run, step through and explain SQLite prepared statements"
)]
pub(crate) struct Cli {
    /// Database file; `:memory:` opens a throwaway in-memory database.
    #[arg(long, env = "STMTKIT_DB", default_value = ":memory:", global = true)]
    pub(crate) db: PathBuf,

    /// Open the database read-only.
    #[arg(long, global = true)]
    pub(crate) read_only: bool,

    /// SQL script run before the command, e.g. schema and seed data.
    #[arg(long, global = true)]
    pub(crate) init: Option<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "STMTKIT_LOG", default_value = "warn", global = true)]
    pub(crate) log_level: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Prepare a query, bind parameters and print every result row.
    Query {
        /// The SQL statement; only the first statement is compiled.
        sql: String,
        /// Positional parameter, repeatable: `null`, integers, reals,
        /// `x'<hex>'` blobs, `'quoted'` or bare text.
        #[arg(short = 'p', long = "param", value_parser = literal::parse)]
        params: Vec<Value>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Plain)]
        format: Format,
        /// Print column names before the rows (plain format only).
        #[arg(long)]
        header: bool,
    },
    /// Run a statement to completion and print the number of changed rows.
    Exec {
        /// The SQL statement.
        sql: String,
        /// Positional parameter, repeatable (same syntax as for `query`).
        #[arg(short = 'p', long = "param", value_parser = literal::parse)]
        params: Vec<Value>,
    },
    /// Print the engine's query plan for a statement.
    Explain {
        /// The SQL statement.
        sql: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// `|`-separated columns, one row per line.
    Plain,
    /// One JSON object per row, keyed by column name.
    Json,
}
