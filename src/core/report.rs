// 移行レポート
//
// テーブルのAUTO_INCREMENT値、ルールの適用回数、外部キーの追加結果を集約した
// レポートと、データベース単位の処理結果を表す構造体群。

use crate::core::rule::TransformationRule;
use crate::core::schema::{ForeignKeyConstraint, ForeignKeyStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// テーブルごとのAUTO_INCREMENT値
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReportEntry {
    pub database: String,
    pub table: String,
    /// AUTO_INCREMENT列を持たないテーブルはNone
    pub auto_increment: Option<u64>,
}

/// ルールごとの適用結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReportEntry {
    pub database: String,
    pub table: String,
    pub column: String,
    pub original: String,
    pub replacement: String,
    pub replacements_done: u64,
}

impl From<&TransformationRule> for RuleReportEntry {
    fn from(rule: &TransformationRule) -> Self {
        Self {
            database: rule.database.clone(),
            table: rule.table.clone(),
            column: rule.column.clone(),
            original: rule.match_literal.clone(),
            replacement: rule.replacement.clone(),
            replacements_done: rule.occurrences_applied,
        }
    }
}

/// 外部キーごとの追加結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyReportEntry {
    pub database: String,
    pub table: String,
    pub fk: String,
    /// `added` または `failed: <理由>`
    pub status: String,
}

impl From<&ForeignKeyConstraint> for ForeignKeyReportEntry {
    fn from(constraint: &ForeignKeyConstraint) -> Self {
        Self {
            database: constraint.database.clone(),
            table: constraint.owning_table.clone(),
            fk: constraint.clause.clone(),
            status: constraint.status.label(),
        }
    }
}

/// 移行レポート本体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// 生成日時
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<TableReportEntry>,
    pub rules: Vec<RuleReportEntry>,
    pub foreign_keys: Vec<ForeignKeyReportEntry>,
}

impl MigrationReport {
    /// 追加に成功した外部キーの数
    pub fn foreign_keys_added(&self) -> usize {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.status == ForeignKeyStatus::Added.label())
            .count()
    }

    /// 追加に失敗した外部キーの数
    pub fn foreign_keys_failed(&self) -> usize {
        self.foreign_keys.len() - self.foreign_keys_added()
    }

    /// 全ルールの適用回数の合計
    pub fn total_replacements(&self) -> u64 {
        self.rules.iter().map(|r| r.replacements_done).sum()
    }
}

/// AUTO_INCREMENT調整の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// 下限値まで引き上げた
    Raised { from: u64 },
    /// 既に下限値以上
    Unchanged { current: u64 },
    /// AUTO_INCREMENT列がない
    NoAutoIncrement,
    /// 読み取りまたは変更に失敗（継続）
    Failed { reason: String },
}

/// テーブルごとのAUTO_INCREMENT調整結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAdjustment {
    pub table: String,
    pub outcome: IndexOutcome,
}

/// データベース単位の処理結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseOutcome {
    /// データベース名
    pub database: String,
    /// 複製したテーブル数
    pub tables_copied: usize,
    /// コピーした行数
    pub rows_copied: u64,
    /// 外部キーの追加結果
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    /// AUTO_INCREMENT調整結果
    pub index_adjustments: Vec<IndexAdjustment>,
}
