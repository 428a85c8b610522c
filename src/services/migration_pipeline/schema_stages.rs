// スキーマ複製ステージ
//
// ターゲットのデータベースを作り直し、ソースの各テーブルを外部キーなしで作成する。
// 外部キーは ForeignKeyConstraint として後段に渡す。

use crate::adapters::source::SourceDatabase;
use crate::adapters::sql_quote::foreign_key_clause;
use crate::adapters::target::TargetDatabase;
use crate::core::error::{DatabaseError, MigrationError};
use crate::core::schema::{CatalogForeignKey, ForeignKeyConstraint, TableDefinition};
use tracing::{debug, info, warn};

use super::MigrationPipeline;

/// 作成済みのテーブルと後回しにした外部キー
#[derive(Debug, Clone)]
pub(super) struct ProvisionedTable {
    pub name: String,
    pub deferred_foreign_keys: Vec<ForeignKeyConstraint>,
}

impl<S: SourceDatabase, T: TargetDatabase> MigrationPipeline<S, T> {
    /// ステージ2: provision - データベース再作成とテーブル作成
    ///
    /// 既存のターゲットデータベースは無条件に削除されます。
    /// テーブルはソースの列挙順（名前順）に作成します。
    pub(super) async fn stage_provision(
        &mut self,
        database: &str,
    ) -> Result<Vec<ProvisionedTable>, MigrationError> {
        self.target
            .recreate_database(database)
            .await
            .map_err(|e| schema_error(database, None, e))?;
        info!(database = %database, "Target database recreated");

        let tables = self
            .source
            .list_tables(database)
            .await
            .map_err(|e| schema_error(database, None, e))?;

        let mut provisioned = Vec::with_capacity(tables.len());
        for table in tables {
            let create_sql = self
                .source
                .show_create_table(database, &table)
                .await
                .map_err(|e| schema_error(database, Some(&table), e))?;
            let catalog = self
                .source
                .foreign_keys(database, &table)
                .await
                .map_err(|e| schema_error(database, Some(&table), e))?;

            let definition = TableDefinition::decompose(&table, &create_sql);
            let clauses = deferred_clauses(database, &definition, &catalog);

            self.target
                .drop_table(database, &table)
                .await
                .map_err(|e| schema_error(database, Some(&table), e))?;
            self.target
                .create_table(database, &definition.base_definition)
                .await
                .map_err(|e| schema_error(database, Some(&table), e))?;

            debug!(
                database = %database,
                table = %table,
                deferred_foreign_keys = clauses.len(),
                "Table created without foreign keys"
            );

            provisioned.push(ProvisionedTable {
                deferred_foreign_keys: clauses
                    .into_iter()
                    .map(|clause| ForeignKeyConstraint::new(database, &table, clause))
                    .collect(),
                name: table,
            });
        }

        Ok(provisioned)
    }
}

/// 後回しにする外部キー句を決定
///
/// カタログから組み立てた句を優先し、CREATE TABLE 文から取り出した句と
/// 件数が食い違う場合のみテキストの句を使います。
pub(crate) fn deferred_clauses(
    database: &str,
    definition: &TableDefinition,
    catalog: &[CatalogForeignKey],
) -> Vec<String> {
    if catalog.len() == definition.deferred_clauses.len() {
        return catalog
            .iter()
            .map(|fk| foreign_key_clause(fk, database))
            .collect();
    }

    warn!(
        database = %database,
        table = %definition.table,
        catalog = catalog.len(),
        ddl = definition.deferred_clauses.len(),
        "Foreign key count differs between catalog and DDL, using DDL clauses"
    );
    definition.deferred_clauses.clone()
}

fn schema_error(database: &str, table: Option<&str>, source: DatabaseError) -> MigrationError {
    MigrationError::Schema {
        database: database.to_string(),
        table: table.map(str::to_string),
        source,
    }
}
