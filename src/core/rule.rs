// 変換ルール
//
// `DATABASE|TABLE|COLUMN|ORIGINAL|REPLACEMENT` 形式のルール定義を解析し、
// 移行中に適用回数を数える構造体として保持します。

use crate::core::error::RuleParseError;
use std::str::FromStr;

/// ルール定義の環境変数プレフィックス
pub const MIGRATION_RULE_PREFIX: &str = "MIGRATION_RULE_";

/// ルール定義のフィールド数
const RULE_FIELD_COUNT: usize = 5;

/// カラム値の変換ルール
///
/// `match_literal` が空の場合は無条件に上書き、空でない場合は部分一致した箇所をすべて置換します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationRule {
    /// 対象データベース
    pub database: String,
    /// 対象テーブル
    pub table: String,
    /// 対象カラム
    pub column: String,
    /// 置換対象の文字列（空なら無条件上書き）
    pub match_literal: String,
    /// 置換後の文字列
    pub replacement: String,
    /// ルールが適用された行数
    pub occurrences_applied: u64,
}

impl TransformationRule {
    /// 新しいルールを作成
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        match_literal: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            column: column.into(),
            match_literal: match_literal.into(),
            replacement: replacement.into(),
            occurrences_applied: 0,
        }
    }

    /// 無条件上書きルールかどうか
    pub fn is_unconditional(&self) -> bool {
        self.match_literal.is_empty()
    }

    /// 指定のデータベース・テーブルを対象とするかどうか
    pub fn targets(&self, database: &str, table: &str) -> bool {
        self.database == database && self.table == table
    }

    /// `database.table.column` 形式の識別子
    pub fn target_path(&self) -> String {
        format!("{}.{}.{}", self.database, self.table, self.column)
    }

    /// 適用回数を1増やす
    pub fn record_application(&mut self) {
        self.occurrences_applied += 1;
    }
}

impl FromStr for TransformationRule {
    type Err = RuleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parts: Vec<&str> = trimmed.split('|').collect();

        if parts.len() != RULE_FIELD_COUNT {
            return Err(RuleParseError::FieldCount {
                value: trimmed.to_string(),
                expected: RULE_FIELD_COUNT,
                found: parts.len(),
            });
        }

        Ok(Self::new(parts[0], parts[1], parts[2], parts[3], parts[4]))
    }
}

/// ルール定義の一覧を解析
///
/// 不正なエントリは結果から除外され、エラーとして別に返されます。
pub fn parse_rules<'a, I>(values: I) -> (Vec<TransformationRule>, Vec<RuleParseError>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut rules = Vec::new();
    let mut errors = Vec::new();

    for value in values {
        match value.parse::<TransformationRule>() {
            Ok(rule) => rules.push(rule),
            Err(e) => errors.push(e),
        }
    }

    (rules, errors)
}
