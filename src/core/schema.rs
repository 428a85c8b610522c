// テーブル定義と外部キー
//
// ソースの CREATE TABLE 文を外部キー以外の定義（ベース定義）と
// 後回しにする外部キー句に分解し、外部キー追加の結果を状態として保持します。

use regex::Regex;
use std::sync::LazyLock;

/// 外部キー句の行を判定するパターン
///
/// `CONSTRAINT name FOREIGN KEY ...` または `FOREIGN KEY ...` で始まる行に一致します。
static FOREIGN_KEY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(CONSTRAINT\s+(`(?:[^`]|``)*`|\S+)\s+)?FOREIGN\s+KEY\b")
        .expect("foreign key pattern is a valid regex")
});

/// 分解済みのテーブル定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// テーブル名
    pub table: String,
    /// 外部キーを除いた CREATE TABLE 文
    pub base_definition: String,
    /// 除去した外部キー句（末尾のカンマは除去済み）
    pub deferred_clauses: Vec<String>,
}

impl TableDefinition {
    /// CREATE TABLE 文を分解
    ///
    /// 外部キー句の行をベース定義から取り除き、閉じ括弧直前に残ったカンマを修復します。
    pub fn decompose(table: impl Into<String>, create_sql: &str) -> Self {
        let mut kept: Vec<String> = Vec::new();
        let mut deferred_clauses = Vec::new();

        for line in create_sql.lines() {
            if is_foreign_key_line(line) {
                deferred_clauses.push(line.trim().trim_end_matches(',').trim_end().to_string());
            } else {
                kept.push(line.to_string());
            }
        }

        // 閉じ括弧の直前に残ったカンマを除去
        for i in 0..kept.len().saturating_sub(1) {
            if kept[i].trim_end().ends_with(',') && kept[i + 1].trim_start().starts_with(')') {
                let repaired = kept[i].trim_end().trim_end_matches(',').to_string();
                kept[i] = repaired;
            }
        }

        Self {
            table: table.into(),
            base_definition: kept.join("\n"),
            deferred_clauses,
        }
    }

    /// 外部キー句を含んでいたかどうか
    pub fn has_foreign_keys(&self) -> bool {
        !self.deferred_clauses.is_empty()
    }
}

/// 外部キー句の行かどうか
pub fn is_foreign_key_line(line: &str) -> bool {
    FOREIGN_KEY_LINE.is_match(line)
}

/// カタログ（information_schema）から取得した外部キー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogForeignKey {
    /// 制約名
    pub name: String,
    /// 参照元カラム
    pub columns: Vec<String>,
    /// 参照先スキーマ
    pub referenced_schema: String,
    /// 参照先テーブル
    pub referenced_table: String,
    /// 参照先カラム
    pub referenced_columns: Vec<String>,
    /// ON UPDATE 動作
    pub on_update: String,
    /// ON DELETE 動作
    pub on_delete: String,
}

/// 外部キー追加の状態
///
/// Added / Failed は終端状態で、再試行されません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeyStatus {
    /// 未処理
    Pending,
    /// 追加済み
    Added,
    /// 追加失敗（ドライバーのエラーメッセージ）
    Failed(String),
}

impl ForeignKeyStatus {
    /// 終端状態かどうか
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ForeignKeyStatus::Pending)
    }

    /// レポート用の表記
    pub fn label(&self) -> String {
        match self {
            ForeignKeyStatus::Pending => "pending".to_string(),
            ForeignKeyStatus::Added => "added".to_string(),
            ForeignKeyStatus::Failed(reason) => format!("failed: {}", reason),
        }
    }
}

/// 後回しにした外部キー制約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    /// データベース名
    pub database: String,
    /// 制約を持つテーブル
    pub owning_table: String,
    /// ALTER TABLE ... ADD に渡す句
    pub clause: String,
    /// 追加状態
    pub status: ForeignKeyStatus,
}

impl ForeignKeyConstraint {
    /// Pending状態の制約を作成
    pub fn new(
        database: impl Into<String>,
        owning_table: impl Into<String>,
        clause: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            owning_table: owning_table.into(),
            clause: clause.into(),
            status: ForeignKeyStatus::Pending,
        }
    }

    /// 追加成功として記録（終端状態からは遷移しない）
    pub fn mark_added(&mut self) {
        if !self.status.is_terminal() {
            self.status = ForeignKeyStatus::Added;
        }
    }

    /// 追加失敗として記録（終端状態からは遷移しない）
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = ForeignKeyStatus::Failed(reason.into());
        }
    }
}
