// レポート出力のテスト

use dbferry::core::report::{
    ForeignKeyReportEntry, MigrationReport, RuleReportEntry, TableReportEntry,
};
use dbferry::services::report_writer::ReportWriter;
use std::fs;
use tempfile::TempDir;

fn sample_report() -> MigrationReport {
    MigrationReport {
        tables: vec![
            TableReportEntry {
                database: "shop".to_string(),
                table: "orders".to_string(),
                auto_increment: Some(60_000),
            },
            TableReportEntry {
                database: "shop".to_string(),
                table: "tags".to_string(),
                auto_increment: None,
            },
        ],
        rules: vec![RuleReportEntry {
            database: "shop".to_string(),
            table: "users".to_string(),
            column: "email".to_string(),
            original: "@old.com".to_string(),
            replacement: "@new.com".to_string(),
            replacements_done: 20,
        }],
        foreign_keys: vec![ForeignKeyReportEntry {
            database: "shop".to_string(),
            table: "orders".to_string(),
            fk: "CONSTRAINT `fk_orders_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)"
                .to_string(),
            status: "added".to_string(),
        }],
        ..Default::default()
    }
}

#[test]
fn test_write_json_report() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("reports/migration_report.json");

    ReportWriter::new().write_json(&sample_report(), &path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(json["generated_at"].is_string());
    assert_eq!(json["tables"][0]["table"], "orders");
    assert_eq!(json["tables"][0]["auto_increment"], 60_000);
    assert!(json["tables"][1]["auto_increment"].is_null());
    assert_eq!(json["rules"][0]["replacements_done"], 20);
    assert_eq!(json["foreign_keys"][0]["status"], "added");
}

#[test]
fn test_write_csv_report() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("migration_report.csv");

    ReportWriter::new().write_csv(&sample_report(), &path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "database,table,auto_increment",
            "shop,orders,60000",
            "shop,tags,",
        ]
    );
}

#[test]
fn test_write_csv_empty_report_has_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.csv");

    ReportWriter::new()
        .write_csv(&MigrationReport::default(), &path)
        .unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap().trim_end(),
        "database,table,auto_increment"
    );
}

#[test]
fn test_write_to_unwritable_path_is_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "file").unwrap();

    let result = ReportWriter::new().write_json(&sample_report(), &blocker.join("report.json"));

    assert!(result.unwrap_err().is_directory_create());
}
