// ルール検証サービス
//
// 各ルールが参照するデータベース・テーブル・カラムがソースに存在するかを、
// 破壊的な操作を始める前に確認します。

use crate::adapters::source::SchemaInspector;
use crate::core::error::{InvalidRule, RuleValidationError};
use crate::core::rule::TransformationRule;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// ルール検証結果
#[derive(Debug, Clone, Default)]
pub struct RuleValidationReport {
    /// 有効なルール
    pub valid: Vec<TransformationRule>,
    /// 無効なルールと理由
    pub invalid: Vec<InvalidRule>,
}

impl RuleValidationReport {
    /// すべてのルールが有効かどうか
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

type Lookup = Result<HashSet<String>, String>;

/// ルール検証サービス
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {}

impl RuleValidator {
    /// 新しいRuleValidatorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// ルールを検証
    ///
    /// データベース → テーブル → カラムの順に確認します。
    /// 同じ検証パス内ではメタデータの取得結果をキャッシュします。
    ///
    /// # Arguments
    ///
    /// * `inspector` - ソースのスキーマ情報取得
    /// * `rules` - 検証するルール
    ///
    /// # Returns
    ///
    /// 有効・無効に振り分けた結果（メタデータ取得の失敗も無効として扱う）
    pub async fn validate<I: SchemaInspector + ?Sized>(
        &self,
        inspector: &mut I,
        rules: &[TransformationRule],
    ) -> RuleValidationReport {
        let mut report = RuleValidationReport::default();
        if rules.is_empty() {
            return report;
        }

        let mut databases: Option<Lookup> = None;
        let mut tables: HashMap<String, Lookup> = HashMap::new();
        let mut columns: HashMap<(String, String), Lookup> = HashMap::new();

        for rule in rules {
            let result = check_rule(inspector, rule, &mut databases, &mut tables, &mut columns).await;

            match result {
                Ok(()) => {
                    debug!(rule = %rule.target_path(), "Rule is valid");
                    report.valid.push(rule.clone());
                }
                Err(reason) => {
                    warn!(rule = %rule.target_path(), "Invalid rule: {}", reason);
                    report.invalid.push(InvalidRule {
                        target: rule.target_path(),
                        reason,
                    });
                }
            }
        }

        report
    }
}

async fn check_rule<I: SchemaInspector + ?Sized>(
    inspector: &mut I,
    rule: &TransformationRule,
    databases: &mut Option<Lookup>,
    tables: &mut HashMap<String, Lookup>,
    columns: &mut HashMap<(String, String), Lookup>,
) -> Result<(), RuleValidationError> {
    if databases.is_none() {
        *databases = Some(to_lookup(inspector.list_databases().await));
    }
    let known_databases = lookup_result(databases.as_ref())?;
    if !known_databases.contains(&rule.database) {
        return Err(RuleValidationError::UnknownDatabase {
            database: rule.database.clone(),
        });
    }

    if !tables.contains_key(&rule.database) {
        let listed = to_lookup(inspector.list_tables(&rule.database).await);
        tables.insert(rule.database.clone(), listed);
    }
    if !lookup_result(tables.get(&rule.database))?.contains(&rule.table) {
        return Err(RuleValidationError::UnknownTable {
            database: rule.database.clone(),
            table: rule.table.clone(),
        });
    }

    let key = (rule.database.clone(), rule.table.clone());
    if !columns.contains_key(&key) {
        let listed = to_lookup(inspector.list_columns(&rule.database, &rule.table).await);
        columns.insert(key.clone(), listed);
    }
    if !lookup_result(columns.get(&key))?.contains(&rule.column) {
        return Err(RuleValidationError::UnknownColumn {
            database: rule.database.clone(),
            table: rule.table.clone(),
            column: rule.column.clone(),
        });
    }

    Ok(())
}

fn to_lookup(
    result: Result<Vec<String>, crate::core::error::DatabaseError>,
) -> Lookup {
    result
        .map(|names| names.into_iter().collect())
        .map_err(|e| e.to_string())
}

fn lookup_result(lookup: Option<&Lookup>) -> Result<&HashSet<String>, RuleValidationError> {
    match lookup {
        Some(Ok(names)) => Ok(names),
        Some(Err(message)) => Err(RuleValidationError::Inspection {
            message: message.clone(),
        }),
        None => Err(RuleValidationError::Inspection {
            message: "metadata was not loaded".to_string(),
        }),
    }
}
