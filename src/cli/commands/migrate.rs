// migrateコマンドハンドラー
//
// データベース移行を実行します。
// - ルール検証（無効なルールがあれば何も変更せず終了）
// - データベースごとのスキーマ複製・データコピー・外部キー追加・AUTO_INCREMENT調整
// - JSON/CSVレポートの書き出し

use crate::cli::command_context::CommandContext;
use crate::cli::commands::format_invalid_rules;
use crate::core::config::ReportPaths;
use crate::core::error::MigrationError;
use crate::core::report::IndexOutcome;
use crate::services::migration_pipeline::{MigrationPipeline, MigrationSummary};
use crate::services::report_writer::ReportWriter;
use crate::services::rule_validator::RuleValidator;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

/// migrateコマンドの入力パラメータ
#[derive(Debug, Clone, Default)]
pub struct MigrateCommand {
    /// JSONレポートの出力先（環境変数より優先）
    pub report_json: Option<PathBuf>,
    /// CSVレポートの出力先（環境変数より優先）
    pub report_csv: Option<PathBuf>,
    /// ルール検証のみ実行
    pub validate_only: bool,
}

/// migrateコマンドハンドラー
#[derive(Debug, Default)]
pub struct MigrateCommandHandler {}

impl MigrateCommandHandler {
    /// 新しいMigrateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// migrateコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `context` - 設定と接続を提供するコンテキスト
    /// * `command` - migrateコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は移行結果のサマリー、失敗時はエラーメッセージ
    pub async fn execute(&self, context: &CommandContext, command: &MigrateCommand) -> Result<String> {
        let mut config = context.migration_config()?;
        if let Some(path) = &command.report_json {
            config.report.json = path.clone();
        }
        if let Some(path) = &command.report_csv {
            config.report.csv = path.clone();
        }
        debug!(databases = ?config.databases, rules = config.rules.len(), "Loaded migration config");

        let mut source = context.connect_source(&config.source).await?;

        // 検証のみの場合はターゲットに接続しない
        if command.validate_only {
            let report = RuleValidator::new()
                .validate(&mut source, &config.rules)
                .await;
            if !report.is_valid() {
                return Err(anyhow!(format_invalid_rules(&report.invalid)));
            }
            return Ok(format!(
                "{} {} rule(s) are valid",
                "✓".green(),
                report.valid.len()
            ));
        }

        let target = context.connect_target(&config.target).await?;
        let mut pipeline = MigrationPipeline::new(source, target, config.rules.clone());

        let summary = match pipeline.run(&config.databases).await {
            Ok(summary) => summary,
            Err(MigrationError::InvalidRules(invalid)) => {
                return Err(anyhow!(format_invalid_rules(&invalid)));
            }
            Err(e) => return Err(e).context("Migration aborted"),
        };

        let writer = ReportWriter::new();
        writer.write_json(&summary.report, &config.report.json)?;
        writer.write_csv(&summary.report, &config.report.csv)?;

        Ok(self.format_summary(&summary, &config.report))
    }

    /// 移行結果を整形
    pub fn format_summary(&self, summary: &MigrationSummary, report_paths: &ReportPaths) -> String {
        let mut output = String::new();

        for outcome in &summary.databases {
            output.push_str(&format!(
                "{} {}: {} table(s), {} row(s)\n",
                "✓".green(),
                outcome.database.bold(),
                outcome.tables_copied,
                outcome.rows_copied
            ));

            let raised = outcome
                .index_adjustments
                .iter()
                .filter(|a| matches!(a.outcome, IndexOutcome::Raised { .. }))
                .count();
            if raised > 0 {
                output.push_str(&format!("  AUTO_INCREMENT raised on {} table(s)\n", raised));
            }

            for adjustment in &outcome.index_adjustments {
                if let IndexOutcome::Failed { reason } = &adjustment.outcome {
                    output.push_str(&format!(
                        "  {} AUTO_INCREMENT not adjusted on {}: {}\n",
                        "⚠".yellow(),
                        adjustment.table,
                        reason
                    ));
                }
            }
        }

        let report = &summary.report;
        output.push_str(&format!(
            "\nRows copied: {}\nReplacements: {}\nForeign keys: {} added, {} failed\n",
            summary.rows_copied,
            report.total_replacements(),
            report.foreign_keys_added(),
            report.foreign_keys_failed()
        ));

        for fk in report.foreign_keys.iter().filter(|fk| fk.status != "added") {
            output.push_str(&format!(
                "  {} {}.{}: {}\n",
                "✗".red(),
                fk.database,
                fk.table,
                fk.status
            ));
        }

        output.push_str(&format!(
            "\nReport: {}, {}",
            report_paths.json.display(),
            report_paths.csv.display()
        ));

        output
    }
}
