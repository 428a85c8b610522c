// 接続オプションビルダー
//
// DatabaseConfig から MySQL の接続オプションを生成する。
// データベースは接続時に固定せず、各クエリで修飾名を使います。

use crate::core::config::DatabaseConfig;
use sqlx::mysql::MySqlConnectOptions;

/// デフォルトのユーザー名
const DEFAULT_USER: &str = "root";

/// 接続オプションを生成
pub fn build_connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(config.user.as_deref().unwrap_or(DEFAULT_USER));

    if let Some(password) = config.password.as_deref() {
        if !password.is_empty() {
            options = options.password(password);
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_with_user_and_port() {
        let config = DatabaseConfig {
            host: "db.internal".to_string(),
            port: 3307,
            user: Some("migrator".to_string()),
            password: Some("pw".to_string()),
            timeout: None,
        };
        let options = build_connect_options(&config);

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "migrator");
    }

    #[test]
    fn test_connect_options_builds() {
        let config = DatabaseConfig::new("localhost");
        let options = build_connect_options(&config);

        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_username(), "root");
    }
}
