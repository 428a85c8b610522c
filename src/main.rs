use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use dbferry::cli::command_context::CommandContext;
use dbferry::cli::commands::migrate::{MigrateCommand, MigrateCommandHandler};
use dbferry::cli::commands::sync_files::{SyncFilesCommand, SyncFilesCommandHandler};
use dbferry::cli::commands::validate::ValidateCommandHandler;
use dbferry::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // .env を読み込む（既存の環境変数が優先）
    let _ = dotenvy::dotenv();

    // CLIをパースして実行
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化（RUST_LOG が設定されていればそちらを優先）
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    let context = CommandContext::from_env();

    match cli.command {
        Commands::Migrate {
            report_json,
            report_csv,
            validate_only,
        } => {
            let handler = MigrateCommandHandler::new();
            let command = MigrateCommand {
                report_json,
                report_csv,
                validate_only,
            };
            handler.execute(&context, &command).await
        }

        Commands::Validate => {
            let handler = ValidateCommandHandler::new();
            handler.execute(&context).await
        }

        Commands::SyncFiles { days } => {
            let handler = SyncFilesCommandHandler::new();
            let command = SyncFilesCommand { days };
            handler.execute(&context, &command)
        }
    }
}
