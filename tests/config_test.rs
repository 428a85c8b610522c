// 設定読み込みのテスト

use dbferry::core::config::{
    FileMapping, SshAuth, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_FILE_HOST,
    DEFAULT_FILE_MODIFIED_DAYS, DEFAULT_SSH_PORT,
};
use dbferry::services::config_loader::ConfigLoader;
use std::path::PathBuf;

fn connection_vars() -> Vec<(String, String)> {
    [
        ("SOURCE_HOST", "prod-db"),
        ("SOURCE_USER", "reader"),
        ("SOURCE_PASSWORD", " secret "),
        ("TARGET_HOST", "staging-db"),
        ("TARGET_PORT", "3307"),
        ("TARGET_TIMEOUT", "30"),
        ("DATABASES", "shop,crm"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn loader_with(extra: &[(&str, &str)]) -> ConfigLoader {
    let mut vars = connection_vars();
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    ConfigLoader::from_vars(vars)
}

#[test]
fn test_migration_config_defaults() {
    let config = loader_with(&[]).migration_config().unwrap();

    assert_eq!(config.source.display_target(), "reader@prod-db:3306");
    assert_eq!(config.source.timeout_secs(), DEFAULT_CONNECT_TIMEOUT_SECS);
    // パスワードは前後の空白も保持
    assert_eq!(config.source.password.as_deref(), Some(" secret "));

    assert_eq!(config.target.port, 3307);
    assert_eq!(config.target.timeout_secs(), 30);

    assert_eq!(config.databases, vec!["shop", "crm"]);
    assert!(config.rules.is_empty());
    assert_eq!(config.report.json, PathBuf::from("migration_report.json"));
    assert_eq!(config.report.csv, PathBuf::from("migration_report.csv"));
}

#[test]
fn test_rules_loaded_in_key_order() {
    let config = loader_with(&[
        ("MIGRATION_RULE_2", "shop|users|phone||000-0000"),
        ("MIGRATION_RULE_1", "shop|users|email|@old.com|@new.com"),
    ])
    .migration_config()
    .unwrap();

    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[0].column, "email");
    assert_eq!(config.rules[1].column, "phone");
    assert!(config.rules[1].is_unconditional());
}

#[test]
fn test_malformed_rules_are_skipped() {
    let config = loader_with(&[
        ("MIGRATION_RULE_1", "shop|users|email"),
        ("MIGRATION_RULE_2", "shop|users|email|a|b|c"),
        ("MIGRATION_RULE_3", "shop|users|email|a|b"),
    ])
    .migration_config()
    .unwrap();

    assert_eq!(config.rules.len(), 1);
    assert_eq!(config.rules[0].match_literal, "a");
}

#[test]
fn test_report_paths_override() {
    let config = loader_with(&[
        ("REPORT_JSON", "out/report.json"),
        ("REPORT_CSV", "out/report.csv"),
    ])
    .migration_config()
    .unwrap();

    assert_eq!(config.report.json, PathBuf::from("out/report.json"));
    assert_eq!(config.report.csv, PathBuf::from("out/report.csv"));
}

#[test]
fn test_empty_database_list_is_error() {
    let mut vars = connection_vars();
    vars.retain(|(k, _)| k != "DATABASES");
    let result = ConfigLoader::from_vars(vars).migration_config();

    assert!(result.is_err());
}

#[test]
fn test_duplicate_database_is_error() {
    let mut vars = connection_vars();
    vars.push(("DATABASES".to_string(), "shop,shop".to_string()));
    let result = ConfigLoader::from_vars(vars).migration_config();

    assert!(result.unwrap_err().to_string().contains("more than once"));
}

#[test]
fn test_file_sync_config() {
    let config = loader_with(&[
        ("FILE_MIGRATION_RULE_1", "/var/www/uploads|./uploads"),
        ("FILE_MIGRATION_RULE_2", "Media|/srv/media|./media"),
        ("FILE_MIGRATION_RULE_3", "broken"),
        ("FILE_HOST_MEDIA_ROOT", "/mnt/media"),
        ("FILE_MODIFIED_DAYS", "7"),
    ])
    .file_sync_config();

    assert_eq!(config.modified_days, 7);
    assert_eq!(
        config.mappings,
        vec![
            FileMapping {
                host: DEFAULT_FILE_HOST.to_string(),
                remote: PathBuf::from("/var/www/uploads"),
                local: PathBuf::from("./uploads"),
            },
            FileMapping {
                host: "media".to_string(),
                remote: PathBuf::from("/srv/media"),
                local: PathBuf::from("./media"),
            },
        ]
    );

    let media = config.host("MEDIA").unwrap();
    assert_eq!(media.root, PathBuf::from("/mnt/media"));
    assert!(media.ssh.is_none());
    assert_eq!(config.host(DEFAULT_FILE_HOST).unwrap().root, PathBuf::from("/"));
    assert!(config.host("backup").is_none());
}

#[test]
fn test_invalid_modified_days_falls_back_to_default() {
    let config = loader_with(&[("FILE_MODIFIED_DAYS", "two weeks")]).file_sync_config();

    assert_eq!(config.modified_days, DEFAULT_FILE_MODIFIED_DAYS);
    assert!(config.mappings.is_empty());
}

#[test]
fn test_default_host_from_ssh_vars() {
    let config = loader_with(&[
        ("SSH_HOST", "files.internal"),
        ("SSH_USER", "deploy"),
        ("SSH_PASSWORD", "hunter2"),
        ("SSH_KEY_PATH", "/home/deploy/.ssh/id_ed25519"),
    ])
    .file_sync_config();

    let host = config.host(DEFAULT_FILE_HOST).unwrap();
    assert_eq!(host.root, PathBuf::from("/"));

    let ssh = host.ssh.unwrap();
    assert_eq!(ssh.host, "files.internal");
    assert_eq!(ssh.port, DEFAULT_SSH_PORT);
    assert_eq!(ssh.user.as_deref(), Some("deploy"));
    // パスワードが秘密鍵より優先
    assert_eq!(ssh.auth, Some(SshAuth::Password("hunter2".to_string())));
}

#[test]
fn test_named_sftp_host_with_private_key() {
    let config = loader_with(&[
        ("FILE_HOST_WEB_01_HOST", "web01.internal"),
        ("FILE_HOST_WEB_01_PORT", "2222"),
        ("FILE_HOST_WEB_01_USER", "www"),
        ("FILE_HOST_WEB_01_KEY_PATH", "/keys/id_rsa"),
        ("FILE_HOST_WEB_01_KEY_PASSPHRASE", "open sesame"),
        ("FILE_HOST_WEB_01_ROOT", "/srv"),
    ])
    .file_sync_config();

    assert_eq!(config.hosts.len(), 1);
    let host = config.host("web_01").unwrap();
    assert_eq!(host.root, PathBuf::from("/srv"));

    let ssh = host.ssh.unwrap();
    assert_eq!(ssh.port, 2222);
    assert_eq!(ssh.display_target(), "www@web01.internal:2222");
    assert_eq!(
        ssh.auth,
        Some(SshAuth::PrivateKey {
            path: PathBuf::from("/keys/id_rsa"),
            passphrase: Some("open sesame".to_string()),
        })
    );
}

#[test]
fn test_sftp_host_without_credentials_has_no_auth() {
    let config = loader_with(&[
        ("FILE_HOST_MEDIA_HOST", "media.internal"),
        ("FILE_HOST_MEDIA_PORT", "ssh"),
    ])
    .file_sync_config();

    let ssh = config.host("media").unwrap().ssh.unwrap();
    assert_eq!(ssh.port, DEFAULT_SSH_PORT);
    assert_eq!(ssh.user, None);
    assert_eq!(ssh.auth, None);
}

#[test]
fn test_explicit_default_host_overrides_ssh_vars() {
    let config = loader_with(&[
        ("SSH_HOST", "files.internal"),
        ("FILE_HOST_DEFAULT_ROOT", "/mnt/files"),
    ])
    .file_sync_config();

    let host = config.host(DEFAULT_FILE_HOST).unwrap();
    assert_eq!(host.root, PathBuf::from("/mnt/files"));
    assert!(host.ssh.is_none());
}

#[test]
fn test_host_without_address_or_root_is_skipped() {
    let config = loader_with(&[("FILE_HOST_BACKUP_PASSWORD", "secret")]).file_sync_config();

    assert!(config.hosts.is_empty());
    assert!(config.host("backup").is_none());
}
