// 外部キー・AUTO_INCREMENT関連パイプラインステージ
//
// 全テーブルの投入後に外部キーを追加し、AUTO_INCREMENT値を下限まで引き上げる。
// どちらも失敗は記録のみで処理を継続する。

use crate::adapters::source::SourceDatabase;
use crate::adapters::target::TargetDatabase;
use crate::core::error::DatabaseError;
use crate::core::report::{IndexAdjustment, IndexOutcome};
use crate::core::schema::ForeignKeyConstraint;
use tracing::{debug, info, warn};

use super::MigrationPipeline;

/// AUTO_INCREMENT値の下限
pub const AUTO_INCREMENT_FLOOR: u64 = 50_000;

impl<S: SourceDatabase, T: TargetDatabase> MigrationPipeline<S, T> {
    /// ステージ4: link - 後回しにした外部キーを追加
    ///
    /// 制約ごとに Added / Failed を記録し、失敗しても次の制約へ進みます。
    pub(super) async fn stage_link(
        &mut self,
        pending: Vec<ForeignKeyConstraint>,
    ) -> Vec<ForeignKeyConstraint> {
        let mut outcomes = Vec::with_capacity(pending.len());

        for mut constraint in pending {
            let result = self
                .target
                .add_foreign_key(&constraint.database, &constraint.owning_table, &constraint.clause)
                .await;

            match result {
                Ok(()) => {
                    info!(
                        database = %constraint.database,
                        table = %constraint.owning_table,
                        fk = %constraint.clause,
                        "Foreign key added"
                    );
                    constraint.mark_added();
                }
                Err(e) => {
                    warn!(
                        database = %constraint.database,
                        table = %constraint.owning_table,
                        fk = %constraint.clause,
                        error = %e,
                        "Failed to add foreign key"
                    );
                    constraint.mark_failed(failure_reason(&e));
                }
            }

            outcomes.push(constraint);
        }

        outcomes
    }

    /// ステージ5: index - AUTO_INCREMENT値を下限まで引き上げる
    ///
    /// 読み取り・変更の失敗は警告のみで、処理は中断しません。
    pub(super) async fn stage_index(&mut self, database: &str) -> Vec<IndexAdjustment> {
        let tables = match self.target.list_tables(database).await {
            Ok(tables) => tables,
            Err(e) => {
                warn!(database = %database, error = %e, "Failed to list target tables, skipping AUTO_INCREMENT adjustment");
                return Vec::new();
            }
        };

        let mut adjustments = Vec::with_capacity(tables.len());
        for table in tables {
            let outcome = self.adjust_auto_increment(database, &table).await;
            adjustments.push(IndexAdjustment { table, outcome });
        }

        adjustments
    }

    async fn adjust_auto_increment(&mut self, database: &str, table: &str) -> IndexOutcome {
        let current = match self.target.auto_increment(database, table).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                debug!(database = %database, table = %table, "No AUTO_INCREMENT column");
                return IndexOutcome::NoAutoIncrement;
            }
            Err(e) => {
                warn!(database = %database, table = %table, error = %e, "Failed to read AUTO_INCREMENT");
                return IndexOutcome::Failed {
                    reason: failure_reason(&e),
                };
            }
        };

        if current >= AUTO_INCREMENT_FLOOR {
            debug!(database = %database, table = %table, current, "AUTO_INCREMENT already at or above floor");
            return IndexOutcome::Unchanged { current };
        }

        match self
            .target
            .set_auto_increment(database, table, AUTO_INCREMENT_FLOOR)
            .await
        {
            Ok(()) => {
                info!(
                    database = %database,
                    table = %table,
                    from = current,
                    to = AUTO_INCREMENT_FLOOR,
                    "AUTO_INCREMENT raised"
                );
                IndexOutcome::Raised { from: current }
            }
            Err(e) => {
                warn!(database = %database, table = %table, error = %e, "Failed to raise AUTO_INCREMENT");
                IndexOutcome::Failed {
                    reason: failure_reason(&e),
                }
            }
        }
    }
}

/// ドライバーのエラーメッセージを理由として取り出す
fn failure_reason(error: &DatabaseError) -> String {
    let reason = match error {
        DatabaseError::Query { message, .. } => message.clone(),
        DatabaseError::Transaction { message } => message.clone(),
        other => other.to_string(),
    };

    if reason.trim().is_empty() {
        "unknown error".to_string()
    } else {
        reason
    }
}
