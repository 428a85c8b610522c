// データコピーステージ
//
// ソースの行を1行ずつ読み出し、ルールを適用してターゲットに挿入する。
// テーブルごとに1トランザクションで、全行の挿入後にコミットする。

use crate::adapters::source::SourceDatabase;
use crate::adapters::target::TargetDatabase;
use crate::core::error::{DatabaseError, MigrationError};
use crate::core::progress::TableProgress;
use crate::core::transform::apply_rules;
use futures::StreamExt;
use tracing::info;

use super::MigrationPipeline;

/// 1テーブル分のコピー結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCopyStats {
    /// 挿入した行数
    pub rows_copied: u64,
}

impl<S: SourceDatabase, T: TargetDatabase> MigrationPipeline<S, T> {
    /// ステージ3: copy - 1テーブル分の行をコピー
    ///
    /// 挿入に失敗した場合はロールバックせずに行位置付きのエラーを返します。
    pub(super) async fn stage_copy_table(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<TableCopyStats, MigrationError> {
        let total = self
            .source
            .count_rows(database, table)
            .await
            .map_err(|e| data_error(database, table, 0, e))?;
        self.progress.register_table(total);
        info!(database = %database, table = %table, rows = total, "Copying table");

        self.target
            .begin_load()
            .await
            .map_err(|e| data_error(database, table, 0, e))?;

        let mut table_progress = TableProgress::new(total);
        let mut position = 0u64;
        let mut rows = self.source.fetch_rows(database, table);

        while let Some(next) = rows.next().await {
            position += 1;
            let mut row = next.map_err(|e| data_error(database, table, position, e))?;

            for index in apply_rules(&mut row, &self.rules, database, table) {
                self.rules[index].record_application();
            }

            self.target
                .insert_row(database, table, &row)
                .await
                .map_err(|e| data_error(database, table, position, e))?;

            if let Some(snapshot) = table_progress.advance() {
                info!(database = %database, table = %table, progress = %snapshot, "Table progress");
            }
            if let Some(snapshot) = self.progress.record_row() {
                info!(progress = %snapshot, "Global progress");
            }
        }
        drop(rows);

        self.target
            .commit_load()
            .await
            .map_err(|e| data_error(database, table, position, e))?;
        info!(database = %database, table = %table, rows = position, "Table copied");

        Ok(TableCopyStats {
            rows_copied: table_progress.processed(),
        })
    }
}

fn data_error(database: &str, table: &str, row: u64, source: DatabaseError) -> MigrationError {
    MigrationError::Data {
        database: database.to_string(),
        table: table.to_string(),
        row,
        source,
    }
}
