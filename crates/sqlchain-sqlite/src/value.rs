//! Conversions between sqlchain values and SQLite storage classes.

use rusqlite::types::{Value as SqliteValue, ValueRef};
use sqlchain_core::{Error, Result, Value};

/// Convert a bound parameter to a SQLite value.
///
/// Temporal values are stored as integers in their native unit, UUIDs as
/// 16-byte blobs, JSON and arrays as JSON text.
pub fn to_sqlite(value: &Value) -> Result<SqliteValue> {
    let converted = match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::TinyInt(i) => SqliteValue::Integer(i64::from(*i)),
        Value::SmallInt(i) => SqliteValue::Integer(i64::from(*i)),
        Value::Int(i) => SqliteValue::Integer(i64::from(*i)),
        Value::BigInt(i) | Value::Time(i) | Value::Timestamp(i) | Value::TimestampTz(i) => {
            SqliteValue::Integer(*i)
        }
        Value::Date(d) => SqliteValue::Integer(i64::from(*d)),
        Value::Float(f) => SqliteValue::Real(f64::from(*f)),
        Value::Double(f) => SqliteValue::Real(*f),
        Value::Decimal(s) | Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Uuid(u) => SqliteValue::Blob(u.to_vec()),
        Value::Json(j) => SqliteValue::Text(j.to_string()),
        Value::Array(_) => SqliteValue::Text(serde_json::to_string(value).map_err(|e| {
            Error::custom(format!("cannot bind array parameter: {}", e))
        })?),
    };
    Ok(converted)
}

/// Convert a column read from SQLite.
pub fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::BigInt(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}
