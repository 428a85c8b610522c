// コマンドハンドラー層
// 各CLIコマンドの実装

pub mod migrate;
pub mod sync_files;
pub mod validate;

use crate::core::error::InvalidRule;
use colored::Colorize;

/// 無効なルールの一覧を整形
pub(crate) fn format_invalid_rules(invalid: &[InvalidRule]) -> String {
    let mut output = format!(
        "{} {} invalid migration rule(s) found, aborting before any change:",
        "✗".red(),
        invalid.len()
    );
    for rule in invalid {
        output.push_str(&format!("\n  - {}", rule));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RuleValidationError;

    #[test]
    fn test_format_invalid_rules() {
        colored::control::set_override(false);

        let text = format_invalid_rules(&[InvalidRule {
            target: "shop.users.mail".to_string(),
            reason: RuleValidationError::UnknownColumn {
                database: "shop".to_string(),
                table: "users".to_string(),
                column: "mail".to_string(),
            },
        }]);

        assert!(text.contains("1 invalid migration rule(s)"));
        assert!(text.contains("- shop.users.mail: Column 'mail' does not exist in shop.users"));
    }
}
