// ターゲットデータベースアダプター
//
// ターゲットサーバーへのデータベース再作成、テーブル作成、行の投入、
// 外部キー追加、AUTO_INCREMENT 操作を抽象化します。

use crate::adapters::sql_quote::{qualified_name, quote_columns, quote_identifier};
use crate::adapters::value_codec::bind_value;
use crate::core::error::DatabaseError;
use crate::core::value::Row;
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::mysql::MySqlConnection;
use sqlx::{Executor, Row as _};
use tracing::debug;

/// ターゲットデータベースインターフェース
///
/// データ投入は `begin_load` → `insert_row`* → `commit_load` の順に呼び出します。
#[async_trait]
pub trait TargetDatabase: Send {
    /// データベースを削除して作り直す
    async fn recreate_database(&mut self, database: &str) -> Result<(), DatabaseError>;

    /// テーブルが存在すれば削除
    async fn drop_table(&mut self, database: &str, table: &str) -> Result<(), DatabaseError>;

    /// CREATE TABLE 文を指定データベース上で実行
    async fn create_table(&mut self, database: &str, ddl: &str) -> Result<(), DatabaseError>;

    /// テーブル単位のトランザクションを開始
    async fn begin_load(&mut self) -> Result<(), DatabaseError>;

    /// 1行を挿入（カラムリストは行自身のカラム）
    async fn insert_row(
        &mut self,
        database: &str,
        table: &str,
        row: &Row,
    ) -> Result<(), DatabaseError>;

    /// テーブル単位のトランザクションをコミット
    async fn commit_load(&mut self) -> Result<(), DatabaseError>;

    /// 外部キー句を追加
    async fn add_foreign_key(
        &mut self,
        database: &str,
        table: &str,
        clause: &str,
    ) -> Result<(), DatabaseError>;

    /// ターゲット上のベーステーブル名一覧を取得
    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, DatabaseError>;

    /// 現在のAUTO_INCREMENT値を取得（AUTO_INCREMENT列がなければNone）
    async fn auto_increment(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Option<u64>, DatabaseError>;

    /// AUTO_INCREMENT値を設定
    async fn set_auto_increment(
        &mut self,
        database: &str,
        table: &str,
        value: u64,
    ) -> Result<(), DatabaseError>;
}

/// MySQLターゲット
pub struct MySqlTarget {
    conn: MySqlConnection,
}

impl MySqlTarget {
    /// 確立済みの接続からターゲットを作成
    ///
    /// MySQL 8 では information_schema の統計がキャッシュされるため、
    /// セッションのキャッシュ期限を0にしてAUTO_INCREMENT値を常に最新にします。
    pub async fn open(conn: MySqlConnection) -> Result<Self, DatabaseError> {
        let mut target = Self { conn };

        // MySQL 5.7 / MariaDB には存在しない変数なので失敗しても継続
        if let Err(e) = target
            .execute("SET SESSION information_schema_stats_expiry = 0")
            .await
        {
            debug!(error = %e, "information_schema_stats_expiry is not supported");
        }

        Ok(target)
    }

    /// プレースホルダーなしのSQLをテキストプロトコルで実行
    ///
    /// `USE` や `START TRANSACTION` はプリペアドステートメントにできないため raw SQL で送る。
    fn execute<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<(), DatabaseError>> {
        Box::pin(async move {
            (&mut self.conn)
                .execute(sqlx::raw_sql(sql))
                .await
                .map_err(|e| DatabaseError::query(e.to_string(), sql))?;
            Ok(())
        })
    }

    async fn use_database(&mut self, database: &str) -> Result<(), DatabaseError> {
        self.execute(&format!("USE {}", quote_identifier(database)))
            .await
    }
}

/// INSERT文を生成
///
/// 値はすべてプレースホルダーでバインドします。
pub fn build_insert_sql(database: &str, table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_name(database, table),
        quote_columns(columns),
        placeholders
    )
}

#[async_trait]
impl TargetDatabase for MySqlTarget {
    async fn recreate_database(&mut self, database: &str) -> Result<(), DatabaseError> {
        let quoted = quote_identifier(database);
        self.execute(&format!("DROP DATABASE IF EXISTS {}", quoted))
            .await?;
        self.execute(&format!("CREATE DATABASE {}", quoted)).await
    }

    async fn drop_table(&mut self, database: &str, table: &str) -> Result<(), DatabaseError> {
        self.execute(&format!(
            "DROP TABLE IF EXISTS {}",
            qualified_name(database, table)
        ))
        .await
    }

    async fn create_table(&mut self, database: &str, ddl: &str) -> Result<(), DatabaseError> {
        // SHOW CREATE TABLE の出力はテーブル名が修飾されていない
        self.use_database(database).await?;
        self.execute(ddl).await
    }

    async fn begin_load(&mut self) -> Result<(), DatabaseError> {
        self.execute("START TRANSACTION")
            .await
            .map_err(|e| DatabaseError::Transaction {
                message: e.to_string(),
            })
    }

    async fn insert_row(
        &mut self,
        database: &str,
        table: &str,
        row: &Row,
    ) -> Result<(), DatabaseError> {
        let sql = build_insert_sql(database, table, &row.column_names());

        let mut query = sqlx::query(&sql);
        for value in row.values() {
            query = bind_value(query, value);
        }

        query
            .execute(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql.as_str()))?;
        Ok(())
    }

    async fn commit_load(&mut self) -> Result<(), DatabaseError> {
        self.execute("COMMIT")
            .await
            .map_err(|e| DatabaseError::Transaction {
                message: e.to_string(),
            })
    }

    async fn add_foreign_key(
        &mut self,
        database: &str,
        table: &str,
        clause: &str,
    ) -> Result<(), DatabaseError> {
        // 参照先テーブル名は現在のデータベースで解決される
        self.use_database(database).await?;
        self.execute(&format!(
            "ALTER TABLE {} ADD {}",
            qualified_name(database, table),
            clause
        ))
        .await
    }

    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let tables: Vec<String> = sqlx::query_scalar(sql)
            .bind(database)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql))?;

        Ok(tables)
    }

    async fn auto_increment(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Option<u64>, DatabaseError> {
        let sql = r#"
            SELECT CAST(AUTO_INCREMENT AS UNSIGNED)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        "#;

        let value: Option<Option<u64>> = sqlx::query_scalar(sql)
            .bind(database)
            .bind(table)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql))?;

        Ok(value.flatten())
    }

    async fn set_auto_increment(
        &mut self,
        database: &str,
        table: &str,
        value: u64,
    ) -> Result<(), DatabaseError> {
        self.execute(&format!(
            "ALTER TABLE {} AUTO_INCREMENT = {}",
            qualified_name(database, table),
            value
        ))
        .await
    }
}
