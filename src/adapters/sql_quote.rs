// SQL識別子クォートユーティリティ
//
// MySQL用の識別子クォートと、カタログから取得した外部キーの句の組み立てを提供します。

use crate::core::schema::CatalogForeignKey;

/// MySQL用識別子クォート（バッククォート）
///
/// 識別子内のバッククォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use dbferry::adapters::sql_quote::quote_identifier;
/// assert_eq!(quote_identifier("users"), "`users`");
/// assert_eq!(quote_identifier("table`name"), "`table``name`");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `database`.`table` 形式の修飾名
pub fn qualified_name(database: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(database), quote_identifier(table))
}

/// カラム名リストをクォートしてカンマ区切りで結合
pub fn quote_columns<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 外部キー句を組み立て
///
/// 参照先が別スキーマの場合のみスキーマで修飾します。
/// RESTRICT / NO ACTION はデフォルト動作のため出力しません。
pub fn foreign_key_clause(fk: &CatalogForeignKey, owning_database: &str) -> String {
    let referenced = if fk.referenced_schema.is_empty() || fk.referenced_schema == owning_database {
        quote_identifier(&fk.referenced_table)
    } else {
        qualified_name(&fk.referenced_schema, &fk.referenced_table)
    };

    let mut clause = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(&fk.name),
        quote_columns(&fk.columns),
        referenced,
        quote_columns(&fk.referenced_columns)
    );

    if let Some(action) = referential_action(&fk.on_delete) {
        clause.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = referential_action(&fk.on_update) {
        clause.push_str(&format!(" ON UPDATE {}", action));
    }

    clause
}

fn referential_action(rule: &str) -> Option<&str> {
    let rule = rule.trim();
    match rule.to_ascii_uppercase().as_str() {
        "" | "RESTRICT" | "NO ACTION" => None,
        _ => Some(rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_fk() -> CatalogForeignKey {
        CatalogForeignKey {
            name: "orders_ibfk_1".to_string(),
            columns: vec!["user_id".to_string()],
            referenced_schema: "shop".to_string(),
            referenced_table: "users".to_string(),
            referenced_columns: vec!["id".to_string()],
            on_update: "RESTRICT".to_string(),
            on_delete: "CASCADE".to_string(),
        }
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("shop", "users"), "`shop`.`users`");
    }

    #[test]
    fn test_quote_columns() {
        assert_eq!(quote_columns(&["id", "email"]), "`id`, `email`");
        assert_eq!(quote_columns::<&str>(&[]), "");
    }

    #[test]
    fn test_foreign_key_clause_same_schema() {
        let clause = foreign_key_clause(&orders_fk(), "shop");

        assert_eq!(
            clause,
            "CONSTRAINT `orders_ibfk_1` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_foreign_key_clause_cross_schema_composite() {
        let fk = CatalogForeignKey {
            name: "fk_ref".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
            referenced_schema: "crm".to_string(),
            referenced_table: "accounts".to_string(),
            referenced_columns: vec!["x".to_string(), "y".to_string()],
            on_update: "CASCADE".to_string(),
            on_delete: "SET NULL".to_string(),
        };

        assert_eq!(
            foreign_key_clause(&fk, "shop"),
            "CONSTRAINT `fk_ref` FOREIGN KEY (`a`, `b`) REFERENCES `crm`.`accounts` (`x`, `y`) ON DELETE SET NULL ON UPDATE CASCADE"
        );
    }
}
