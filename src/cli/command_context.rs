// コマンド共通コンテキスト
//
// 設定読み込みと接続確立の重複をCLI層で集約する。

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::source::MySqlSource;
use crate::adapters::target::MySqlTarget;
use crate::core::config::{DatabaseConfig, FileSyncConfig, MigrationConfig};
use crate::core::rule::TransformationRule;
use crate::services::config_loader::ConfigLoader;
use anyhow::{Context, Result};
use tracing::info;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    loader: ConfigLoader,
}

impl CommandContext {
    /// プロセス環境から作成
    pub fn from_env() -> Self {
        Self::with_loader(ConfigLoader::from_env())
    }

    /// ローダーを指定して作成
    pub fn with_loader(loader: ConfigLoader) -> Self {
        Self { loader }
    }

    /// 移行ジョブ設定を読み込む
    pub fn migration_config(&self) -> Result<MigrationConfig> {
        self.loader
            .migration_config()
            .context("Failed to load migration settings from the environment")
    }

    /// ソースの接続設定を読み込む（ターゲット設定は不要）
    pub fn source_config(&self) -> Result<DatabaseConfig> {
        self.loader
            .database_config("SOURCE")
            .context("Failed to load source settings from the environment")
    }

    /// 移行ルールを読み込む
    pub fn rules(&self) -> Vec<TransformationRule> {
        self.loader.rules()
    }

    /// ファイル同期設定を読み込む
    pub fn file_sync_config(&self) -> FileSyncConfig {
        self.loader.file_sync_config()
    }

    /// ソースに接続
    pub async fn connect_source(&self, config: &DatabaseConfig) -> Result<MySqlSource> {
        let service = DatabaseConnectionService::new();
        let mut conn = service
            .connect(config)
            .await
            .with_context(|| format!("Failed to connect to source {}", config.display_target()))?;
        service.test_connection(&mut conn).await?;

        info!(source = %config.display_target(), "Connected to source");
        Ok(MySqlSource::new(conn))
    }

    /// ターゲットに接続
    pub async fn connect_target(&self, config: &DatabaseConfig) -> Result<MySqlTarget> {
        let service = DatabaseConnectionService::new();
        let mut conn = service
            .connect(config)
            .await
            .with_context(|| format!("Failed to connect to target {}", config.display_target()))?;
        service.test_connection(&mut conn).await?;

        info!(target_server = %config.display_target(), "Connected to target");
        Ok(MySqlTarget::open(conn).await?)
    }
}
