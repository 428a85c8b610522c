// データベース接続アダプター
//
// SQLxを使用したMySQL接続の確立を行います。
// ソースとターゲットはそれぞれ1本の接続を実行中ずっと保持し、プールは使いません。

use crate::adapters::connection_string::build_connect_options;
use crate::core::config::DatabaseConfig;
use crate::core::error::DatabaseError;
use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use std::time::Duration;
use tracing::debug;

/// データベース接続サービス
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// 接続を確立
    ///
    /// # Arguments
    ///
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 確立した接続またはエラー
    pub async fn connect(&self, config: &DatabaseConfig) -> Result<MySqlConnection, DatabaseError> {
        let options = build_connect_options(config);
        let timeout = Duration::from_secs(config.timeout_secs());

        debug!(target_server = %config.display_target(), timeout_secs = timeout.as_secs(), "Connecting");

        let conn = tokio::time::timeout(timeout, MySqlConnection::connect_with(&options))
            .await
            .map_err(|_| DatabaseError::Connection {
                message: format!("データベース接続がタイムアウトしました: {}", config.display_target()),
                cause: format!("no response within {}s", timeout.as_secs()),
            })?
            .map_err(|e| DatabaseError::Connection {
                message: format!("データベース接続に失敗しました: {}", config.display_target()),
                cause: e.to_string(),
            })?;

        Ok(conn)
    }

    /// 接続テストを実行
    pub async fn test_connection(&self, conn: &mut MySqlConnection) -> Result<(), DatabaseError> {
        conn.ping().await.map_err(|e| DatabaseError::Connection {
            message: "データベース接続テストに失敗しました".to_string(),
            cause: e.to_string(),
        })
    }
}
