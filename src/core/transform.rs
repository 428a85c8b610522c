// 行変換
//
// 変換ルールを1行に適用する純粋関数。ルールの適用回数は呼び出し側が
// 返却されたインデックスを元に加算します。

use crate::core::rule::TransformationRule;
use crate::core::value::{Row, SqlValue};

/// 1つのルールを1行に適用
///
/// ルールが発火した（値を書き換えた）場合に true を返します。
/// 部分一致ルールは値に含まれるすべての出現箇所を置換しますが、発火は1回と数えます。
pub fn apply_rule(row: &mut Row, rule: &TransformationRule) -> bool {
    let Some(value) = row.get_mut(&rule.column) else {
        return false;
    };

    if rule.is_unconditional() {
        *value = SqlValue::Text(rule.replacement.clone());
        return true;
    }

    match value.to_text() {
        Some(text) if text.contains(rule.match_literal.as_str()) => {
            *value = SqlValue::Text(text.replace(rule.match_literal.as_str(), &rule.replacement));
            true
        }
        _ => false,
    }
}

/// 対象データベース・テーブルに一致するルールをルール順に適用
///
/// 発火したルールのインデックス（`rules` 内の位置）を返します。
pub fn apply_rules(
    row: &mut Row,
    rules: &[TransformationRule],
    database: &str,
    table: &str,
) -> Vec<usize> {
    rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.targets(database, table))
        .filter_map(|(index, rule)| apply_rule(row, rule).then_some(index))
        .collect()
}
