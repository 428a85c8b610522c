// validateコマンドハンドラー
//
// ソースにのみ接続し、移行ルールが参照する識別子の存在を確認します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::format_invalid_rules;
use crate::services::rule_validator::RuleValidator;
use anyhow::{anyhow, Result};
use colored::Colorize;

/// validateコマンドハンドラー
#[derive(Debug, Default)]
pub struct ValidateCommandHandler {}

impl ValidateCommandHandler {
    /// 新しいValidateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// validateコマンドを実行
    ///
    /// ターゲットの設定は読まず、接続もしません。
    pub async fn execute(&self, context: &CommandContext) -> Result<String> {
        let rules = context.rules();
        if rules.is_empty() {
            return Ok(format!("{} No migration rules configured", "⚠".yellow()));
        }

        let source_config = context.source_config()?;
        let mut source = context.connect_source(&source_config).await?;
        let report = RuleValidator::new().validate(&mut source, &rules).await;

        if !report.is_valid() {
            return Err(anyhow!(format_invalid_rules(&report.invalid)));
        }

        let mut output = format!("{} All {} rule(s) are valid", "✓".green(), report.valid.len());
        for rule in &report.valid {
            let action = if rule.is_unconditional() {
                format!("set to '{}'", rule.replacement)
            } else {
                format!("'{}' -> '{}'", rule.match_literal, rule.replacement)
            };
            output.push_str(&format!("\n  - {}: {}", rule.target_path(), action));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::config_loader::ConfigLoader;

    fn context(vars: &[(&str, &str)]) -> CommandContext {
        CommandContext::with_loader(ConfigLoader::from_vars(vars.iter().copied()))
    }

    #[tokio::test]
    async fn test_no_rules_needs_no_settings() {
        let output = ValidateCommandHandler::new()
            .execute(&context(&[]))
            .await
            .unwrap();

        assert!(output.contains("No migration rules configured"));
    }

    #[tokio::test]
    async fn test_target_settings_are_not_required() {
        // 接続を拒否されるポートのソースのみ設定
        let ctx = context(&[
            ("SOURCE_HOST", "127.0.0.1"),
            ("SOURCE_PORT", "1"),
            ("SOURCE_TIMEOUT", "5"),
            ("MIGRATION_RULE_1", "shop|users|email|@old.com|@new.com"),
        ]);

        let error = ValidateCommandHandler::new().execute(&ctx).await.unwrap_err();

        let message = format!("{:#}", error);
        assert!(message.contains("Failed to connect to source"));
        assert!(!message.contains("TARGET_HOST"));
    }

    #[tokio::test]
    async fn test_missing_source_host_is_error() {
        let ctx = context(&[("MIGRATION_RULE_1", "shop|users|email|a|b")]);

        let error = ValidateCommandHandler::new().execute(&ctx).await.unwrap_err();

        assert!(format!("{:#}", error).contains("SOURCE_HOST"));
    }
}
