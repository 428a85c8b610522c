// sync-filesコマンドハンドラー
//
// FILE_MIGRATION_RULE_* のマッピングに従い、最近更新されたファイルをコピーします。
// 無効なマッピングが1つでもあれば何もコピーせずに終了します。

use crate::cli::command_context::CommandContext;
use crate::services::file_sync::{FileSyncService, MappingOutcome, SyncSummary};
use anyhow::{anyhow, Result};
use colored::Colorize;

/// sync-filesコマンドの入力パラメータ
#[derive(Debug, Clone, Default)]
pub struct SyncFilesCommand {
    /// 対象期間（日）。FILE_MODIFIED_DAYS より優先
    pub days: Option<u64>,
}

/// sync-filesコマンドハンドラー
#[derive(Debug, Default)]
pub struct SyncFilesCommandHandler {}

impl SyncFilesCommandHandler {
    /// 新しいSyncFilesCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// sync-filesコマンドを実行
    pub fn execute(&self, context: &CommandContext, command: &SyncFilesCommand) -> Result<String> {
        let mut config = context.file_sync_config();
        if let Some(days) = command.days {
            config.modified_days = days;
        }

        if config.mappings.is_empty() {
            return Ok(format!("{} No file mappings configured", "⚠".yellow()));
        }

        let service = FileSyncService::new(config.modified_days);
        let summary = service.run(&config).map_err(|invalid| {
            let mut message = format!(
                "{} {} invalid file mapping(s) found, aborting before any copy:",
                "✗".red(),
                invalid.len()
            );
            for entry in &invalid {
                message.push_str(&format!(
                    "\n  - {} -> {}: {}",
                    entry.mapping.remote.display(),
                    entry.mapping.local.display(),
                    entry.reason
                ));
            }
            anyhow!(message)
        })?;

        let output = self.format_summary(&summary, config.modified_days);
        if summary.has_failures() {
            return Err(anyhow!(output));
        }
        Ok(output)
    }

    /// 同期結果を整形
    pub fn format_summary(&self, summary: &SyncSummary, days: u64) -> String {
        let mut output = format!("Files modified in the last {} day(s):", days);

        for outcome in &summary.mappings {
            match outcome {
                MappingOutcome::Completed {
                    mapping,
                    files_copied,
                } => output.push_str(&format!(
                    "\n  {} {} -> {} ({} file(s))",
                    "✓".green(),
                    mapping.remote.display(),
                    mapping.local.display(),
                    files_copied
                )),
                MappingOutcome::Failed {
                    mapping,
                    files_copied,
                    reason,
                } => output.push_str(&format!(
                    "\n  {} {} -> {} aborted after {} file(s): {}",
                    "✗".red(),
                    mapping.remote.display(),
                    mapping.local.display(),
                    files_copied,
                    reason
                )),
            }
        }

        output.push_str(&format!("\nTotal: {} file(s) copied", summary.files_copied));
        output
    }
}
