// MySQL値のデコード・バインド
//
// 動的な SELECT * の結果を SqlValue の行に変換し、INSERT 時に型に応じてバインドします。

use crate::core::error::DatabaseError;
use crate::core::value::{Row, SqlTime, SqlValue};
use sqlx::mysql::types::{MySqlTime, MySqlTimeError, MySqlTimeSign};
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// 列の型名から決まるデコード方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Signed,
    Unsigned,
    Bit,
    Year,
    Float,
    Double,
    /// 10進表記の文字列として読む（精度を落とさない）
    Decimal,
    Date,
    /// MySqlTime として読む（24時間以上・負の値を保持）
    Time,
    DateTime,
    Binary,
    /// CHAR/VARCHAR/TEXT/ENUM/SET/JSON など
    Text,
}

/// 型名をデコード方法に対応付ける
pub fn value_kind(type_name: &str) -> ValueKind {
    match type_name {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => ValueKind::Signed,
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => ValueKind::Unsigned,
        "BIT" => ValueKind::Bit,
        "YEAR" => ValueKind::Year,
        "FLOAT" => ValueKind::Float,
        "DOUBLE" => ValueKind::Double,
        "DECIMAL" => ValueKind::Decimal,
        "DATE" => ValueKind::Date,
        "TIME" => ValueKind::Time,
        "DATETIME" | "TIMESTAMP" => ValueKind::DateTime,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            ValueKind::Binary
        }
        _ => ValueKind::Text,
    }
}

/// MySQLの行をRowに変換
pub fn decode_row(row: &MySqlRow) -> Result<Row, DatabaseError> {
    let mut decoded = Row::new();

    for (index, column) in row.columns().iter().enumerate() {
        let kind = value_kind(column.type_info().name());
        let value = decode_value(row, index, kind).map_err(|e| DatabaseError::Decode {
            column: column.name().to_string(),
            message: e.to_string(),
        })?;
        decoded.push(column.name(), value);
    }

    Ok(decoded)
}

/// 1つの値をデコード
fn decode_value(row: &MySqlRow, index: usize, kind: ValueKind) -> Result<SqlValue, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let value = match kind {
        ValueKind::Signed => SqlValue::Int(row.try_get::<i64, _>(index)?),
        ValueKind::Unsigned => SqlValue::UInt(row.try_get::<u64, _>(index)?),
        ValueKind::Bit => SqlValue::UInt(row.try_get_unchecked::<u64, _>(index)?),
        ValueKind::Year => SqlValue::UInt(u64::from(row.try_get_unchecked::<u16, _>(index)?)),
        ValueKind::Float => SqlValue::Float(row.try_get::<f32, _>(index)?),
        ValueKind::Double => SqlValue::Double(row.try_get::<f64, _>(index)?),
        // バイナリプロトコルでもDECIMALは10進文字列で届く
        ValueKind::Decimal => SqlValue::Decimal(row.try_get_unchecked::<String, _>(index)?),
        ValueKind::Date => SqlValue::Date(row.try_get::<chrono::NaiveDate, _>(index)?),
        ValueKind::Time => {
            SqlValue::Time(from_mysql_time(&row.try_get_unchecked::<MySqlTime, _>(index)?))
        }
        ValueKind::DateTime => {
            SqlValue::DateTime(row.try_get::<chrono::NaiveDateTime, _>(index)?)
        }
        ValueKind::Binary => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        // UTF-8でなければバイト列として扱う
        ValueKind::Text => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) => SqlValue::Text(text),
            Err(_) => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        },
    };

    Ok(value)
}

/// MySqlTime を SqlTime に変換
pub fn from_mysql_time(time: &MySqlTime) -> SqlTime {
    SqlTime {
        negative: time.is_negative(),
        hours: time.hours(),
        minutes: time.minutes(),
        seconds: time.seconds(),
        microseconds: time.microseconds(),
    }
}

/// SqlTime を MySqlTime に変換
pub fn to_mysql_time(time: &SqlTime) -> Result<MySqlTime, MySqlTimeError> {
    let sign = if time.negative {
        MySqlTimeSign::Negative
    } else {
        MySqlTimeSign::Positive
    };
    MySqlTime::new(
        sign,
        time.hours,
        time.minutes,
        time.seconds,
        time.microseconds,
    )
}

/// 値をクエリにバインド
pub fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::UInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Double(v) => query.bind(*v),
        // サーバー側で文字列からDECIMALへ正確に変換される
        SqlValue::Decimal(v) => query.bind(v.as_str()),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => match to_mysql_time(v) {
            Ok(time) => query.bind(time),
            // 範囲外はサーバーの文字列変換に任せる
            Err(_) => query.bind(v.to_string()),
        },
        SqlValue::DateTime(v) => query.bind(*v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_integers() {
        assert_eq!(value_kind("TINYINT"), ValueKind::Signed);
        assert_eq!(value_kind("BOOLEAN"), ValueKind::Signed);
        assert_eq!(value_kind("BIGINT"), ValueKind::Signed);
        assert_eq!(value_kind("INT UNSIGNED"), ValueKind::Unsigned);
        assert_eq!(value_kind("BIGINT UNSIGNED"), ValueKind::Unsigned);
        assert_eq!(value_kind("BIT"), ValueKind::Bit);
        assert_eq!(value_kind("YEAR"), ValueKind::Year);
    }

    #[test]
    fn test_value_kind_exact_and_temporal() {
        assert_eq!(value_kind("DECIMAL"), ValueKind::Decimal);
        assert_eq!(value_kind("FLOAT"), ValueKind::Float);
        assert_eq!(value_kind("DOUBLE"), ValueKind::Double);
        assert_eq!(value_kind("DATE"), ValueKind::Date);
        assert_eq!(value_kind("TIME"), ValueKind::Time);
        assert_eq!(value_kind("DATETIME"), ValueKind::DateTime);
        assert_eq!(value_kind("TIMESTAMP"), ValueKind::DateTime);
    }

    #[test]
    fn test_value_kind_binary_and_text() {
        assert_eq!(value_kind("VARBINARY"), ValueKind::Binary);
        assert_eq!(value_kind("LONGBLOB"), ValueKind::Binary);
        assert_eq!(value_kind("GEOMETRY"), ValueKind::Binary);
        assert_eq!(value_kind("VARCHAR"), ValueKind::Text);
        assert_eq!(value_kind("ENUM"), ValueKind::Text);
        assert_eq!(value_kind("JSON"), ValueKind::Text);
    }

    #[test]
    fn test_time_over_one_day_keeps_hours() {
        let time = MySqlTime::new(MySqlTimeSign::Positive, 36, 0, 0, 0).unwrap();

        let converted = from_mysql_time(&time);

        assert_eq!(converted, SqlTime::new(36, 0, 0));
        assert_eq!(to_mysql_time(&converted).unwrap(), time);
    }

    #[test]
    fn test_negative_time_keeps_sign() {
        let time = MySqlTime::new(MySqlTimeSign::Negative, 1, 30, 0, 0).unwrap();

        let converted = from_mysql_time(&time);

        assert!(converted.negative);
        assert_eq!(converted.to_string(), "-01:30:00");
        assert_eq!(to_mysql_time(&converted).unwrap(), time);
    }

    #[test]
    fn test_time_microseconds_round_trip() {
        let time = MySqlTime::new(MySqlTimeSign::Positive, 838, 59, 58, 999_999).unwrap();

        assert_eq!(to_mysql_time(&from_mysql_time(&time)).unwrap(), time);
    }

    #[test]
    fn test_time_out_of_range_is_rejected() {
        let result = to_mysql_time(&SqlTime::new(900, 0, 0));

        assert!(result.is_err());
    }
}
