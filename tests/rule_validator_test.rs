// ルール検証サービスのテスト

use async_trait::async_trait;
use dbferry::adapters::source::SchemaInspector;
use dbferry::core::error::{DatabaseError, RuleValidationError};
use dbferry::core::rule::TransformationRule;
use dbferry::services::rule_validator::RuleValidator;
use std::collections::BTreeMap;

/// メタデータ問い合わせ回数を数えるインスペクター
#[derive(Debug, Default)]
struct CountingInspector {
    schema: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    fail_tables: bool,
    database_calls: usize,
    table_calls: usize,
    column_calls: usize,
}

impl CountingInspector {
    fn shop() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            "users".to_string(),
            vec!["id".to_string(), "email".to_string(), "phone".to_string()],
        );
        tables.insert(
            "orders".to_string(),
            vec!["id".to_string(), "user_id".to_string()],
        );

        let mut schema = BTreeMap::new();
        schema.insert("shop".to_string(), tables);
        Self {
            schema,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SchemaInspector for CountingInspector {
    async fn list_databases(&mut self) -> Result<Vec<String>, DatabaseError> {
        self.database_calls += 1;
        Ok(self.schema.keys().cloned().collect())
    }

    async fn list_tables(&mut self, database: &str) -> Result<Vec<String>, DatabaseError> {
        self.table_calls += 1;
        if self.fail_tables {
            return Err(DatabaseError::Connection {
                message: "Lost connection to MySQL server".to_string(),
                cause: "broken pipe".to_string(),
            });
        }
        Ok(self
            .schema
            .get(database)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        self.column_calls += 1;
        Ok(self
            .schema
            .get(database)
            .and_then(|t| t.get(table))
            .cloned()
            .unwrap_or_default())
    }
}

fn rule(value: &str) -> TransformationRule {
    value.parse().unwrap()
}

#[tokio::test]
async fn test_all_rules_valid() {
    let mut inspector = CountingInspector::shop();
    let rules = vec![
        rule("shop|users|email|@old.com|@new.com"),
        rule("shop|users|phone||000-0000"),
        rule("shop|orders|user_id|1|2"),
    ];

    let report = RuleValidator::new().validate(&mut inspector, &rules).await;

    assert!(report.is_valid());
    assert_eq!(report.valid, rules);
}

#[tokio::test]
async fn test_reports_each_missing_identifier() {
    let mut inspector = CountingInspector::shop();
    let rules = vec![
        rule("crm|users|email|a|b"),
        rule("shop|customers|email|a|b"),
        rule("shop|users|mail|a|b"),
        rule("shop|users|email|a|b"),
    ];

    let report = RuleValidator::new().validate(&mut inspector, &rules).await;

    assert!(!report.is_valid());
    assert_eq!(report.valid.len(), 1);
    assert_eq!(report.invalid.len(), 3);

    assert_eq!(
        report.invalid[0].reason,
        RuleValidationError::UnknownDatabase {
            database: "crm".to_string()
        }
    );
    assert_eq!(
        report.invalid[1].reason,
        RuleValidationError::UnknownTable {
            database: "shop".to_string(),
            table: "customers".to_string(),
        }
    );
    assert_eq!(
        report.invalid[2].reason,
        RuleValidationError::UnknownColumn {
            database: "shop".to_string(),
            table: "users".to_string(),
            column: "mail".to_string(),
        }
    );
    assert_eq!(report.invalid[2].target, "shop.users.mail");
}

#[tokio::test]
async fn test_identifiers_are_case_sensitive() {
    let mut inspector = CountingInspector::shop();
    let rules = vec![rule("shop|users|Email|a|b")];

    let report = RuleValidator::new().validate(&mut inspector, &rules).await;

    assert_eq!(report.invalid.len(), 1);
    assert!(report.invalid[0].reason.is_missing_identifier());
}

#[tokio::test]
async fn test_metadata_lookups_are_cached() {
    let mut inspector = CountingInspector::shop();
    let rules = vec![
        rule("shop|users|email|a|b"),
        rule("shop|users|phone|c|d"),
        rule("shop|orders|user_id|1|2"),
    ];

    RuleValidator::new().validate(&mut inspector, &rules).await;

    assert_eq!(inspector.database_calls, 1);
    assert_eq!(inspector.table_calls, 1);
    assert_eq!(inspector.column_calls, 2);
}

#[tokio::test]
async fn test_inspection_failure_invalidates_rule() {
    let mut inspector = CountingInspector::shop();
    inspector.fail_tables = true;
    let rules = vec![rule("shop|users|email|a|b")];

    let report = RuleValidator::new().validate(&mut inspector, &rules).await;

    assert_eq!(report.invalid.len(), 1);
    assert!(!report.invalid[0].reason.is_missing_identifier());
    assert!(report.invalid[0]
        .reason
        .to_string()
        .contains("Lost connection to MySQL server"));
}

#[tokio::test]
async fn test_no_rules_skips_inspection() {
    let mut inspector = CountingInspector::shop();

    let report = RuleValidator::new().validate(&mut inspector, &[]).await;

    assert!(report.is_valid());
    assert_eq!(inspector.database_calls, 0);
}
