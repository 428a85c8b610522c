// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dbferry - MySQL database migration CLI
///
/// Copies whole databases from a source server to a target server,
/// rewriting column values on the way and re-linking foreign keys afterwards.
#[derive(Parser, Debug)]
#[command(name = "dbferry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy MySQL databases between servers with value rewriting rules")]
#[command(long_about = "dbferry - MySQL database migration CLI

Copies the schema and rows of one or more databases from a source server to a
target server. Every run drops and recreates the target databases.

dbferry:
  • Validates every MIGRATION_RULE_* entry against the source before touching the target
  • Recreates tables without foreign keys and streams rows into them
  • Rewrites column values with the configured rules while copying
  • Re-adds foreign keys once every table of a database is loaded
  • Raises low AUTO_INCREMENT counters and writes a JSON/CSV report

Configuration is read from the environment (and a .env file).")]
#[command(propagate_version = true)]
#[command(after_help = "ENVIRONMENT:
  SOURCE_HOST / SOURCE_PORT / SOURCE_USER / SOURCE_PASSWORD
  TARGET_HOST / TARGET_PORT / TARGET_USER / TARGET_PASSWORD
  DATABASES               Comma-separated databases to migrate, in order
  MIGRATION_RULE_*        DATABASE|TABLE|COLUMN|ORIGINAL|REPLACEMENT
  FILE_MIGRATION_RULE_*   REMOTE|LOCAL or HOST|REMOTE|LOCAL
  SSH_HOST / SSH_PORT / SSH_USER / SSH_PASSWORD / SSH_KEY_PATH / SSH_KEY_PASSPHRASE
                          SFTP settings of the default file host
  FILE_HOST_<NAME>_*      HOST, PORT, USER, PASSWORD, KEY_PATH, KEY_PASSPHRASE (SFTP)
                          or ROOT (mount point) of a named file host
  FILE_MODIFIED_DAYS      File sync window in days (default 15)

For detailed help on each command, use: dbferry <command> --help")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the configured databases from source to target
    ///
    /// Validates the rules first and aborts without any change if one of them
    /// references a database, table or column missing on the source.
    ///
    /// EXAMPLES:
    ///   # Full migration
    ///   dbferry migrate
    ///
    ///   # Only check the rules
    ///   dbferry migrate --validate-only
    ///
    ///   # Write reports elsewhere
    ///   dbferry migrate --report-json out/report.json --report-csv out/tables.csv
    Migrate {
        /// JSON report path (overrides REPORT_JSON)
        #[arg(long, value_name = "FILE")]
        report_json: Option<PathBuf>,

        /// CSV report path (overrides REPORT_CSV)
        #[arg(long, value_name = "FILE")]
        report_csv: Option<PathBuf>,

        /// Validate rules against the source and stop
        #[arg(long)]
        validate_only: bool,
    },

    /// Validate migration rules against the source server
    Validate,

    /// Copy recently modified files from remote directories
    ///
    /// EXAMPLES:
    ///   # Files modified in the last 15 days (default)
    ///   dbferry sync-files
    ///
    ///   # Files modified in the last 3 days
    ///   dbferry sync-files --days 3
    SyncFiles {
        /// Modification window in days (overrides FILE_MODIFIED_DAYS)
        #[arg(long, value_name = "DAYS")]
        days: Option<u64>,
    },
}
