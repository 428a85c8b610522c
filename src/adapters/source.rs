// ソースデータベースアダプター
//
// ソースサーバーからのメタデータ取得と行の読み出しを抽象化します。
// 行はストリームとして1行ずつ取り出し、テーブル全体をメモリに載せません。

use crate::adapters::sql_quote::qualified_name;
use crate::adapters::value_codec::decode_row;
use crate::core::error::DatabaseError;
use crate::core::schema::CatalogForeignKey;
use crate::core::value::Row;
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::mysql::MySqlConnection;
use sqlx::Row as _;

/// ソースから読み出す行のストリーム
pub type RowStream<'a> = BoxStream<'a, Result<Row, DatabaseError>>;

/// スキーマ情報取得インターフェース
///
/// ルール検証が参照する読み取り専用のメタデータ操作です。
#[async_trait]
pub trait SchemaInspector: Send {
    /// データベース名一覧を取得
    async fn list_databases(&mut self) -> Result<Vec<String>, DatabaseError>;

    /// ベーステーブル名一覧を取得（ビューは除外、名前順）
    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, DatabaseError>;

    /// カラム名一覧を取得（定義順）
    async fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<String>, DatabaseError>;
}

/// ソースデータベースインターフェース
#[async_trait]
pub trait SourceDatabase: SchemaInspector {
    /// CREATE TABLE 文を取得
    async fn show_create_table(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<String, DatabaseError>;

    /// カタログから外部キー定義を取得
    async fn foreign_keys(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<CatalogForeignKey>, DatabaseError>;

    /// 行数を取得
    async fn count_rows(&mut self, database: &str, table: &str) -> Result<u64, DatabaseError>;

    /// 全行をソース上の順序で読み出す
    fn fetch_rows<'a>(&'a mut self, database: &str, table: &str) -> RowStream<'a>;
}

/// MySQLソース
pub struct MySqlSource {
    conn: MySqlConnection,
}

impl MySqlSource {
    /// 確立済みの接続からソースを作成
    pub fn new(conn: MySqlConnection) -> Self {
        Self { conn }
    }

    async fn fetch_strings(
        &mut self,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<String>, DatabaseError> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }

        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| DatabaseError::query(e.to_string(), sql))
            })
            .collect()
    }
}

#[async_trait]
impl SchemaInspector for MySqlSource {
    async fn list_databases(&mut self) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT CAST(SCHEMA_NAME AS CHAR)
            FROM information_schema.SCHEMATA
            ORDER BY SCHEMA_NAME
        "#;

        self.fetch_strings(sql, &[]).await
    }

    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        self.fetch_strings(sql, &[database]).await
    }

    async fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR)
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        self.fetch_strings(sql, &[database, table]).await
    }
}

#[async_trait]
impl SourceDatabase for MySqlSource {
    async fn show_create_table(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<String, DatabaseError> {
        let sql = format!("SHOW CREATE TABLE {}", qualified_name(database, table));

        let row = sqlx::query(&sql)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql.as_str()))?;

        // 1列目はテーブル名、2列目が CREATE TABLE 文
        row.try_get_unchecked::<String, _>(1)
            .map_err(|e| DatabaseError::query(e.to_string(), sql.as_str()))
    }

    async fn foreign_keys(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<CatalogForeignKey>, DatabaseError> {
        let sql = r#"
            SELECT
                CAST(k.CONSTRAINT_NAME AS CHAR),
                CAST(k.COLUMN_NAME AS CHAR),
                CAST(k.REFERENCED_TABLE_SCHEMA AS CHAR),
                CAST(k.REFERENCED_TABLE_NAME AS CHAR),
                CAST(k.REFERENCED_COLUMN_NAME AS CHAR),
                CAST(r.UPDATE_RULE AS CHAR),
                CAST(r.DELETE_RULE AS CHAR)
            FROM information_schema.KEY_COLUMN_USAGE k
            JOIN information_schema.REFERENTIAL_CONSTRAINTS r
                ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
                AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
                AND r.TABLE_NAME = k.TABLE_NAME
            WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
                AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#;

        let rows = sqlx::query(sql)
            .bind(database)
            .bind(table)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql))?;

        // 制約名でまとめる（複合外部キー対応）。行は制約名順に並んでいる
        let mut foreign_keys: Vec<CatalogForeignKey> = Vec::new();
        for row in &rows {
            let get = |index: usize| {
                row.try_get::<String, _>(index)
                    .map_err(|e| DatabaseError::query(e.to_string(), sql))
            };

            let name = get(0)?;
            let column = get(1)?;
            let referenced_column = get(4)?;

            match foreign_keys.last_mut() {
                Some(fk) if fk.name == name => {
                    fk.columns.push(column);
                    fk.referenced_columns.push(referenced_column);
                }
                _ => foreign_keys.push(CatalogForeignKey {
                    name,
                    columns: vec![column],
                    referenced_schema: get(2)?,
                    referenced_table: get(3)?,
                    referenced_columns: vec![referenced_column],
                    on_update: get(5)?,
                    on_delete: get(6)?,
                }),
            }
        }

        Ok(foreign_keys)
    }

    async fn count_rows(&mut self, database: &str, table: &str) -> Result<u64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified_name(database, table));

        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql.as_str()))?;

        Ok(count.max(0) as u64)
    }

    fn fetch_rows<'a>(&'a mut self, database: &str, table: &str) -> RowStream<'a> {
        let sql = format!("SELECT * FROM {}", qualified_name(database, table));
        let conn = &mut self.conn;

        Box::pin(stream! {
            let mut rows = sqlx::query(&sql).fetch(&mut *conn);
            while let Some(next) = rows.next().await {
                yield next
                    .map_err(|e| DatabaseError::query(e.to_string(), sql.as_str()))
                    .and_then(|row| decode_row(&row));
            }
        })
    }
}
