// 設定読み込みサービス
//
// core::config の純粋性を保つため、環境変数の読み込みはこのサービスに集約する。
// 変数はキーと値の組として受け取るため、プロセス環境に触れずにテストできます。

use crate::core::config::{
    DatabaseConfig, FileHostConfig, FileMapping, FileSyncConfig, MigrationConfig, ReportPaths,
    SshAuth, SshSettings, DEFAULT_FILE_HOST, DEFAULT_FILE_MODIFIED_DAYS, DEFAULT_SSH_PORT,
};
use crate::core::rule::{parse_rules, TransformationRule, MIGRATION_RULE_PREFIX};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// ファイルマッピングの変数プレフィックス
pub const FILE_MIGRATION_RULE_PREFIX: &str = "FILE_MIGRATION_RULE_";

const FILE_HOST_PREFIX: &str = "FILE_HOST_";

/// デフォルトホストのSSH設定プレフィックス
const DEFAULT_SSH_PREFIX: &str = "SSH_";

/// ホスト設定のキー（長いものから照合する）
const FILE_HOST_SUFFIXES: [&str; 7] = [
    "_KEY_PASSPHRASE",
    "_KEY_PATH",
    "_PASSWORD",
    "_HOST",
    "_PORT",
    "_USER",
    "_ROOT",
];

/// 設定読み込みサービス
///
/// 変数はキー順に保持し、ルールの読み込み順を実行ごとに固定します。
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    vars: BTreeMap<String, String>,
}

impl ConfigLoader {
    /// キーと値の組から作成
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// プロセス環境から作成（UTF-8でない変数は無視）
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `<PREFIX>_HOST` などから接続設定を読み込む
    ///
    /// # Arguments
    ///
    /// * `prefix` - `SOURCE` または `TARGET`
    pub fn database_config(&self, prefix: &str) -> Result<DatabaseConfig> {
        let host = self
            .get(&format!("{}_HOST", prefix))
            .ok_or_else(|| anyhow!("{}_HOST is not set", prefix))?;

        let mut config = DatabaseConfig::new(host);

        if let Some(port) = self.get(&format!("{}_PORT", prefix)) {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid {}_PORT: {}", prefix, port))?;
        }
        if let Some(timeout) = self.get(&format!("{}_TIMEOUT", prefix)) {
            config.timeout = Some(
                timeout
                    .parse()
                    .with_context(|| format!("Invalid {}_TIMEOUT: {}", prefix, timeout))?,
            );
        }
        config.user = self.get(&format!("{}_USER", prefix)).map(str::to_string);
        // パスワードは空白も含めてそのまま使う
        config.password = self.vars.get(&format!("{}_PASSWORD", prefix)).cloned();

        Ok(config)
    }

    /// MIGRATION_RULE_* をキー順に読み込む
    ///
    /// 不正なルール定義は警告を出して読み飛ばします。
    pub fn rules(&self) -> Vec<TransformationRule> {
        let (rules, malformed) =
            parse_rules(self.with_prefix(MIGRATION_RULE_PREFIX).map(|(_, v)| v));
        for error in &malformed {
            warn!(value = %error.value(), "Skipping malformed migration rule: {}", error);
        }
        debug!(rules = rules.len(), skipped = malformed.len(), "Loaded migration rules");
        rules
    }

    /// 移行ジョブ設定を読み込む
    ///
    /// 不正なルール定義は警告を出して読み飛ばします。
    pub fn migration_config(&self) -> Result<MigrationConfig> {
        let source = self.database_config("SOURCE")?;
        let target = self.database_config("TARGET")?;

        let databases: Vec<String> = self
            .get("DATABASES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        let rules = self.rules();

        let mut report = ReportPaths::default();
        if let Some(path) = self.get("REPORT_JSON") {
            report.json = PathBuf::from(path);
        }
        if let Some(path) = self.get("REPORT_CSV") {
            report.csv = PathBuf::from(path);
        }

        let config = MigrationConfig {
            source,
            target,
            databases,
            rules,
            report,
        };
        config.validate()?;

        Ok(config)
    }

    /// ファイル同期設定を読み込む
    ///
    /// 不正なマッピングは警告を出して読み飛ばします。
    /// `FILE_MODIFIED_DAYS` が数値でなければデフォルトの15日を使います。
    pub fn file_sync_config(&self) -> FileSyncConfig {
        let mut mappings = Vec::new();
        for (key, value) in self.with_prefix(FILE_MIGRATION_RULE_PREFIX) {
            match value.parse::<FileMapping>() {
                Ok(mapping) => mappings.push(mapping),
                Err(e) => warn!(key = %key, "Skipping file mapping: {}", e),
            }
        }

        let mut names: Vec<&str> = self
            .with_prefix(FILE_HOST_PREFIX)
            .filter_map(|(key, _)| {
                let rest = key.strip_prefix(FILE_HOST_PREFIX)?;
                FILE_HOST_SUFFIXES
                    .iter()
                    .find_map(|suffix| rest.strip_suffix(suffix))
                    .filter(|name| !name.is_empty())
            })
            .collect();
        names.sort_unstable();
        names.dedup();

        let mut hosts: Vec<FileHostConfig> = names
            .into_iter()
            .filter_map(|name| {
                let prefix = format!("{}{}_", FILE_HOST_PREFIX, name);
                let host = self.file_host_config(&name.to_ascii_lowercase(), &prefix);
                if host.is_none() {
                    warn!(host = %name, "Skipping file host without {}HOST or {}ROOT", prefix, prefix);
                }
                host
            })
            .collect();

        // SSH_* はデフォルトホストの接続設定（FILE_HOST_DEFAULT_* が優先）
        if !hosts.iter().any(|h| h.name == DEFAULT_FILE_HOST) {
            if let Some(ssh) = self.ssh_settings(DEFAULT_SSH_PREFIX) {
                hosts.push(FileHostConfig::sftp(DEFAULT_FILE_HOST, ssh));
            }
        }

        let modified_days = match self.get("FILE_MODIFIED_DAYS") {
            None => DEFAULT_FILE_MODIFIED_DAYS,
            Some(days) => days.parse().unwrap_or_else(|_| {
                warn!(value = %days, "Invalid FILE_MODIFIED_DAYS, using {}", DEFAULT_FILE_MODIFIED_DAYS);
                DEFAULT_FILE_MODIFIED_DAYS
            }),
        };

        FileSyncConfig {
            mappings,
            hosts,
            modified_days,
        }
    }

    /// `<prefix>ROOT` と `<prefix>HOST` からホスト設定を作る
    ///
    /// どちらもなければ None。HOST があればSFTP、なければマウント済みディレクトリとして扱います。
    fn file_host_config(&self, name: &str, prefix: &str) -> Option<FileHostConfig> {
        let root = self.get(&format!("{}ROOT", prefix)).map(PathBuf::from);

        match (self.ssh_settings(prefix), root) {
            (Some(ssh), root) => {
                let mut host = FileHostConfig::sftp(name, ssh);
                if let Some(root) = root {
                    host.root = root;
                }
                Some(host)
            }
            (None, Some(root)) => Some(FileHostConfig::mounted(name, root)),
            (None, None) => None,
        }
    }

    /// `<prefix>HOST` などからSSH接続設定を読み込む
    ///
    /// パスワードが設定されていれば秘密鍵より優先します。
    fn ssh_settings(&self, prefix: &str) -> Option<SshSettings> {
        let mut ssh = SshSettings::new(self.get(&format!("{}HOST", prefix))?);

        if let Some(port) = self.get(&format!("{}PORT", prefix)) {
            ssh.port = port.parse().unwrap_or_else(|_| {
                warn!(value = %port, "Invalid {}PORT, using {}", prefix, DEFAULT_SSH_PORT);
                DEFAULT_SSH_PORT
            });
        }
        ssh.user = self.get(&format!("{}USER", prefix)).map(str::to_string);

        ssh.auth = match (
            self.get(&format!("{}PASSWORD", prefix)),
            self.get(&format!("{}KEY_PATH", prefix)),
        ) {
            (Some(password), _) => Some(SshAuth::Password(password.to_string())),
            (None, Some(path)) => Some(SshAuth::PrivateKey {
                path: PathBuf::from(path),
                // パスフレーズは空白も含めてそのまま使う
                passphrase: self.vars.get(&format!("{}KEY_PASSPHRASE", prefix)).cloned(),
            }),
            (None, None) => None,
        };

        Some(ssh)
    }
}
