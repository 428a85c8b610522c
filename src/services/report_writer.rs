// レポート出力サービス
//
// MigrationReport をJSON（全体）とCSV（テーブル一覧のフラット出力）で書き出します。

use crate::core::error::IoError;
use crate::core::report::MigrationReport;
use std::fs;
use std::path::Path;
use tracing::info;

/// レポート出力サービス
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {}

impl ReportWriter {
    /// 新しいReportWriterを作成
    pub fn new() -> Self {
        Self {}
    }

    /// JSONレポートを書き出す（整形済み）
    pub fn write_json(&self, report: &MigrationReport, path: &Path) -> Result<(), IoError> {
        ensure_parent_dir(path)?;

        let json = serde_json::to_string_pretty(report).map_err(|e| IoError::FileWrite {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        fs::write(path, json).map_err(|e| IoError::FileWrite {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        info!(path = %path.display(), "JSON report written");
        Ok(())
    }

    /// CSVレポートを書き出す
    ///
    /// ヘッダーは `database,table,auto_increment`。値がない場合は空欄になります。
    pub fn write_csv(&self, report: &MigrationReport, path: &Path) -> Result<(), IoError> {
        ensure_parent_dir(path)?;

        let write_error = |cause: String| IoError::FileWrite {
            path: path.display().to_string(),
            cause,
        };

        let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(e.to_string()))?;
        if report.tables.is_empty() {
            writer
                .write_record(["database", "table", "auto_increment"])
                .map_err(|e| write_error(e.to_string()))?;
        }
        for entry in &report.tables {
            writer
                .serialize(entry)
                .map_err(|e| write_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| write_error(e.to_string()))?;

        info!(path = %path.display(), rows = report.tables.len(), "CSV report written");
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), IoError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| IoError::DirectoryCreate {
                path: parent.display().to_string(),
                cause: e.to_string(),
            })
        }
        _ => Ok(()),
    }
}
