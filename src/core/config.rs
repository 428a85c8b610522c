// 設定管理
//
// 移行ジョブの設定（接続先、対象データベース、ルール、レポート出力先）を表す
// 純粋な構造体群。環境変数からの読み込みは services::config_loader が担当します。

use crate::core::error::FileSyncError;
use crate::core::rule::TransformationRule;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// MySQLのデフォルトポート
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// 接続タイムアウトのデフォルト（秒）
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 600;

/// JSONレポートのデフォルト出力先
pub const DEFAULT_REPORT_JSON: &str = "migration_report.json";

/// CSVレポートのデフォルト出力先
pub const DEFAULT_REPORT_CSV: &str = "migration_report.csv";

/// ファイル同期の対象期間（日）のデフォルト
pub const DEFAULT_FILE_MODIFIED_DAYS: u64 = 15;

/// ホスト指定のないファイルマッピングが使うホスト名
pub const DEFAULT_FILE_HOST: &str = "default";

/// SSHのデフォルトポート
pub const DEFAULT_SSH_PORT: u16 = 22;

/// データベース接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// ホスト名
    pub host: String,

    /// ポート番号
    pub port: u16,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

impl DatabaseConfig {
    /// ホスト名を指定して作成（その他はデフォルト）
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            user: None,
            password: None,
            timeout: None,
        }
    }

    /// Validate database configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(anyhow!("Database host is not specified"));
        }
        if self.port == 0 {
            return Err(anyhow!("Database port must be greater than 0"));
        }

        Ok(())
    }

    /// ログ出力用の接続先表記（パスワードは含めない）
    pub fn display_target(&self) -> String {
        match self.user.as_deref() {
            Some(user) => format!("{}@{}:{}", user, self.host, self.port),
            None => format!("{}:{}", self.host, self.port),
        }
    }

    /// 接続タイムアウト（未指定ならデフォルト）
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }
}

/// レポート出力先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// JSONレポート
    pub json: PathBuf,
    /// CSVレポート（テーブル一覧のフラット出力）
    pub csv: PathBuf,
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self {
            json: PathBuf::from(DEFAULT_REPORT_JSON),
            csv: PathBuf::from(DEFAULT_REPORT_CSV),
        }
    }
}

/// 移行ジョブ設定
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// ソースサーバー
    pub source: DatabaseConfig,

    /// ターゲットサーバー
    pub target: DatabaseConfig,

    /// 移行対象のデータベース（処理順）
    pub databases: Vec<String>,

    /// 変換ルール（設定順）
    pub rules: Vec<TransformationRule>,

    /// レポート出力先
    pub report: ReportPaths,
}

impl MigrationConfig {
    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        self.source
            .validate()
            .map_err(|e| anyhow!("Invalid source config: {}", e))?;
        self.target
            .validate()
            .map_err(|e| anyhow!("Invalid target config: {}", e))?;

        if self.databases.is_empty() {
            return Err(anyhow!("At least one database to migrate is required"));
        }

        let mut seen = std::collections::HashSet::new();
        for database in &self.databases {
            if !seen.insert(database.as_str()) {
                return Err(anyhow!("Database '{}' is listed more than once", database));
            }
        }

        Ok(())
    }
}

/// ファイル同期のマッピング（リモートディレクトリ → ローカルディレクトリ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    /// ファイルホスト名（小文字）
    pub host: String,
    /// リモートディレクトリ
    pub remote: PathBuf,
    /// ローカルディレクトリ
    pub local: PathBuf,
}

impl FromStr for FileMapping {
    type Err = FileSyncError;

    /// `REMOTE|LOCAL` または `HOST|REMOTE|LOCAL` を解析
    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let malformed = || FileSyncError::MalformedMapping {
            value: value.to_string(),
        };

        let fields: Vec<&str> = value.trim().split('|').map(str::trim).collect();
        let (host, remote, local) = match fields.as_slice() {
            [remote, local] => (DEFAULT_FILE_HOST, *remote, *local),
            [host, remote, local] if !host.is_empty() => (*host, *remote, *local),
            _ => return Err(malformed()),
        };

        if remote.is_empty() || local.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            host: host.to_ascii_lowercase(),
            remote: PathBuf::from(remote),
            local: PathBuf::from(local),
        })
    }
}

/// SSH認証方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshAuth {
    /// パスワード認証
    Password(String),
    /// 秘密鍵認証（ed25519 / RSA）
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

/// SFTP接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    /// パスワードと秘密鍵の両方が設定されていればパスワードを優先
    pub auth: Option<SshAuth>,
}

impl SshSettings {
    /// ホストを指定して作成（ポート22、認証なし）
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: None,
            auth: None,
        }
    }

    /// ログ出力用の接続先表記
    pub fn display_target(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}:{}", user, self.host, self.port),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

/// ファイルホスト設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHostConfig {
    /// ホスト名（小文字）
    pub name: String,
    /// リモートパスの基準ディレクトリ
    ///
    /// SFTPではリモート上のディレクトリ、それ以外ではツリーをマウントしたローカルディレクトリ。
    pub root: PathBuf,
    /// 設定されていればSFTPで接続
    pub ssh: Option<SshSettings>,
}

impl FileHostConfig {
    /// ローカルにマウントされたホスト
    pub fn mounted(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            ssh: None,
        }
    }

    /// SFTPで接続するホスト（リモートの `/` を基準にする）
    pub fn sftp(name: impl Into<String>, ssh: SshSettings) -> Self {
        Self {
            name: name.into(),
            root: PathBuf::from("/"),
            ssh: Some(ssh),
        }
    }
}

/// ファイル同期設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSyncConfig {
    pub mappings: Vec<FileMapping>,
    pub hosts: Vec<FileHostConfig>,
    /// この日数以内に更新されたファイルをコピー
    pub modified_days: u64,
}

impl FileSyncConfig {
    /// ホスト設定を名前で検索
    ///
    /// デフォルトホストが未設定の場合はルート `/` のホストとして扱います。
    pub fn host(&self, name: &str) -> Option<FileHostConfig> {
        let name = name.to_ascii_lowercase();
        self.hosts
            .iter()
            .find(|h| h.name == name)
            .cloned()
            .or_else(|| {
                (name == DEFAULT_FILE_HOST)
                    .then(|| FileHostConfig::mounted(DEFAULT_FILE_HOST, "/"))
            })
    }
}
