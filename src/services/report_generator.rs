// レポート生成サービス
//
// 移行後のターゲットからAUTO_INCREMENT値を収集し、ルールの適用回数と
// 外部キーの追加結果とあわせて MigrationReport を組み立てます。

use crate::adapters::target::TargetDatabase;
use crate::core::error::DatabaseError;
use crate::core::report::{ForeignKeyReportEntry, MigrationReport, RuleReportEntry, TableReportEntry};
use crate::core::rule::TransformationRule;
use crate::core::schema::ForeignKeyConstraint;
use chrono::Utc;
use tracing::{debug, warn};

/// レポート生成サービス
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {}

impl ReportGenerator {
    /// 新しいReportGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// レポートを生成
    ///
    /// # Arguments
    ///
    /// * `target` - 移行先
    /// * `databases` - 移行したデータベース（ジョブ順）
    /// * `rules` - 適用回数を記録済みのルール
    /// * `foreign_keys` - 外部キーの追加結果
    pub async fn generate<T: TargetDatabase + ?Sized>(
        &self,
        target: &mut T,
        databases: &[String],
        rules: &[TransformationRule],
        foreign_keys: &[ForeignKeyConstraint],
    ) -> Result<MigrationReport, DatabaseError> {
        let mut tables = Vec::new();

        for database in databases {
            for table in target.list_tables(database).await? {
                // 読み取りに失敗したテーブルは値なしで記録
                let auto_increment = match target.auto_increment(database, &table).await {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(database = %database, table = %table, error = %e, "Failed to read AUTO_INCREMENT");
                        None
                    }
                };

                tables.push(TableReportEntry {
                    database: database.clone(),
                    table,
                    auto_increment,
                });
            }
        }

        let report = MigrationReport {
            generated_at: Utc::now(),
            tables,
            rules: rules.iter().map(RuleReportEntry::from).collect(),
            foreign_keys: foreign_keys.iter().map(ForeignKeyReportEntry::from).collect(),
        };

        debug!(
            tables = report.tables.len(),
            rules = report.rules.len(),
            foreign_keys = report.foreign_keys.len(),
            "Report generated"
        );

        Ok(report)
    }
}
