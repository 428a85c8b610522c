// 行と値のモデル
//
// ソースから読み出した1行を、カラム順を保った (カラム名, 値) の列として表現します。

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// SQLの値
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL
    Null,
    /// 符号付き整数
    Int(i64),
    /// 符号なし整数
    UInt(u64),
    /// 単精度浮動小数点
    Float(f32),
    /// 倍精度浮動小数点
    Double(f64),
    /// 固定小数点（サーバーが返した10進表記のまま保持）
    Decimal(String),
    /// 文字列
    Text(String),
    /// バイト列
    Bytes(Vec<u8>),
    /// 日付
    Date(NaiveDate),
    /// TIME型（経過時間。24時間以上や負の値も取り得る）
    Time(SqlTime),
    /// 日時
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// NULLかどうか
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// 値の文字列表現（NULLはNone）
    ///
    /// 部分一致ルールはこの表現に対して適用されます。
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::UInt(v) => Some(v.to_string()),
            SqlValue::Float(v) => Some(v.to_string()),
            SqlValue::Double(v) => Some(v.to_string()),
            SqlValue::Decimal(v) => Some(v.clone()),
            SqlValue::Text(v) => Some(v.clone()),
            SqlValue::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
            SqlValue::Date(v) => Some(v.format("%Y-%m-%d").to_string()),
            SqlValue::Time(v) => Some(v.to_string()),
            SqlValue::DateTime(v) => Some(v.to_string()),
        }
    }
}

/// MySQLのTIME値
///
/// 範囲は `-838:59:59` から `838:59:59` です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlTime {
    pub negative: bool,
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}

impl SqlTime {
    /// 正の時刻を作成
    pub fn new(hours: u32, minutes: u8, seconds: u8) -> Self {
        Self {
            negative: false,
            hours,
            minutes,
            seconds,
            microseconds: 0,
        }
    }

    /// 符号を反転した値を返す
    pub fn negated(self) -> Self {
        Self {
            negative: !self.negative,
            ..self
        }
    }
}

impl fmt::Display for SqlTime {
    /// MySQLと同じ `[-]HH:MM:SS[.ffffff]` 形式
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)?;
        if self.microseconds != 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }
        Ok(())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

/// ソースから読み出した1行
///
/// カラムの並びはSELECT結果の順序を保持します。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// 空の行を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// カラムを末尾に追加
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push((column.into(), value));
    }

    /// カラムを追加したRowを返す（ビルダー形式）
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value.into());
        self
    }

    /// カラム値を取得
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// カラム値を可変参照で取得
    pub fn get_mut(&mut self, column: &str) -> Option<&mut SqlValue> {
        self.columns
            .iter_mut()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// カラム名の一覧（行内の順序）
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// 値の一覧（行内の順序）
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.columns.iter().map(|(_, value)| value)
    }

    /// カラム数
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// カラムが空かどうか
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_text_scalars() {
        assert_eq!(SqlValue::Null.to_text(), None);
        assert_eq!(SqlValue::Int(-42).to_text().as_deref(), Some("-42"));
        assert_eq!(SqlValue::UInt(7).to_text().as_deref(), Some("7"));
        assert_eq!(SqlValue::Double(1.5).to_text().as_deref(), Some("1.5"));
        assert_eq!(
            SqlValue::Decimal("12.30".to_string()).to_text().as_deref(),
            Some("12.30")
        );
        // 28桁を超える精度もそのまま
        let wide = "12345678901234567890123456789012345.123456789012345678901234567890";
        assert_eq!(
            SqlValue::Decimal(wide.to_string()).to_text().as_deref(),
            Some(wide)
        );
        assert_eq!(
            SqlValue::Bytes(b"abc".to_vec()).to_text().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_to_text_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let datetime = date.and_hms_opt(8, 5, 0).unwrap();

        assert_eq!(SqlValue::Date(date).to_text().as_deref(), Some("2024-03-09"));
        assert_eq!(
            SqlValue::DateTime(datetime).to_text().as_deref(),
            Some("2024-03-09 08:05:00")
        );
        assert_eq!(
            SqlValue::Time(SqlTime::new(23, 0, 1)).to_text().as_deref(),
            Some("23:00:01")
        );
    }

    #[test]
    fn test_time_beyond_one_day_and_negative() {
        assert_eq!(SqlTime::new(36, 0, 0).to_string(), "36:00:00");
        assert_eq!(SqlTime::new(1, 30, 0).negated().to_string(), "-01:30:00");
        assert_eq!(SqlTime::new(838, 59, 59).to_string(), "838:59:59");

        let fractional = SqlTime {
            microseconds: 500,
            ..SqlTime::new(0, 0, 7)
        };
        assert_eq!(fractional.to_string(), "00:00:07.000500");
    }

    #[test]
    fn test_row_preserves_column_order() {
        let row = Row::new()
            .with("id", 1i64)
            .with("email", "a@old.com")
            .with("name", "Alice");

        assert_eq!(row.column_names(), vec!["id", "email", "name"]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get("email"), Some(&SqlValue::Text("a@old.com".into())));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_row_get_mut() {
        let mut row = Row::new().with("email", "a@old.com");

        if let Some(value) = row.get_mut("email") {
            *value = SqlValue::Null;
        }

        assert!(row.get("email").unwrap().is_null());
    }
}
