use crate::error::{Error, Result};
use crate::types::datatype::DataType;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Numeric(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Json(JsonValue),
    Uuid(Uuid),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the value can be stored in a column of `dtype` without conversion.
    pub fn matches_type(&self, dtype: &DataType) -> bool {
        match (self, dtype) {
            (Value::Null, _) => true,
            (Value::Bool(_), DataType::Bool)
            | (Value::Int64(_), DataType::Int64)
            | (Value::Float64(_), DataType::Float64)
            | (Value::Numeric(_), DataType::Numeric)
            | (Value::String(_), DataType::String)
            | (Value::Bytes(_), DataType::Bytes)
            | (Value::Date(_), DataType::Date)
            | (Value::Timestamp(_), DataType::Timestamp)
            | (Value::Json(_), DataType::Json)
            | (Value::Uuid(_), DataType::Uuid) => true,
            (Value::Array(items), DataType::Array(inner)) => {
                items.iter().all(|item| item.matches_type(inner))
            }
            _ => false,
        }
    }

    /// Length in characters (STRING) or bytes (BYTES); `None` for other types.
    pub fn declared_length(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int64(_) => 2,
            Value::Float64(_) => 3,
            Value::Numeric(_) => 4,
            Value::String(_) => 5,
            Value::Bytes(_) => 6,
            Value::Date(_) => 7,
            Value::Timestamp(_) => 8,
            Value::Json(_) => 9,
            Value::Uuid(_) => 10,
            Value::Array(_) => 11,
        }
    }
}

// Values form storage keys, so they need a total order. NULL sorts first;
// values of different types order by type.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Numeric(a), Value::Numeric(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Json(a), Value::Json(b)) => a.to_string().cmp(&b.to_string()),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

/// Converts `value` for storage in a column of `dtype`.
///
/// INT64 widens to FLOAT64 and NUMERIC; every other pairing must match exactly.
pub fn coerce_value(value: Value, dtype: &DataType) -> Result<Value> {
    if value.matches_type(dtype) {
        return Ok(value);
    }
    match (value, dtype) {
        (Value::Int64(n), DataType::Float64) => Ok(Value::Float64(n as f64)),
        (Value::Int64(n), DataType::Numeric) => Ok(Value::Numeric(Decimal::from(n))),
        (Value::Array(items), DataType::Array(inner)) => items
            .into_iter()
            .map(|item| coerce_value(item, inner))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (other, dtype) => Err(Error::TypeMismatch(format!(
            "cannot store {} in a column of type {}",
            value_to_string(&other),
            dtype
        ))),
    }
}

pub fn parse_value(dtype: &DataType, token: &str) -> Result<Value> {
    if token.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    match dtype {
        DataType::Bool => parse_bool(token).map(Value::Bool),
        DataType::Int64 => {
            let n: i64 = token
                .parse()
                .map_err(|_| Error::TypeMismatch(format!("Expected int64 but got '{token}'")))?;
            Ok(Value::Int64(n))
        }
        DataType::Float64 => {
            let n: f64 = token
                .parse()
                .map_err(|_| Error::TypeMismatch(format!("Expected float64 but got '{token}'")))?;
            Ok(Value::Float64(n))
        }
        DataType::Numeric => {
            let d = token
                .parse::<Decimal>()
                .map_err(|_| Error::TypeMismatch(format!("Expected numeric but got '{token}'")))?;
            Ok(Value::Numeric(d))
        }
        DataType::String => Ok(Value::String(token.to_string())),
        DataType::Bytes => {
            let raw = token.strip_prefix("0x").unwrap_or(token);
            let bytes = hex::decode(raw).map_err(|_| {
                Error::TypeMismatch(format!(
                    "Expected hex bytes (e.g. 0xDEADBEEF) but got '{token}'"
                ))
            })?;
            Ok(Value::Bytes(bytes))
        }
        DataType::Date => {
            let d = NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| {
                Error::TypeMismatch(format!("Expected date YYYY-MM-DD but got '{token}'"))
            })?;
            Ok(Value::Date(d))
        }
        DataType::Timestamp => parse_timestamp(token).map(Value::Timestamp),
        DataType::Json => {
            let j: JsonValue = serde_json::from_str(token).map_err(|_| {
                Error::TypeMismatch(format!("Expected valid JSON but got '{token}'"))
            })?;
            Ok(Value::Json(j))
        }
        DataType::Uuid => {
            let u = Uuid::parse_str(token)
                .map_err(|_| Error::TypeMismatch(format!("Expected uuid but got '{token}'")))?;
            Ok(Value::Uuid(u))
        }
        DataType::Array(inner) => {
            let body = token
                .trim()
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(|| {
                    Error::TypeMismatch(format!("Expected array [a, b, ...] but got '{token}'"))
                })?;
            if body.trim().is_empty() {
                return Ok(Value::Array(Vec::new()));
            }
            body.split(',')
                .map(|item| parse_value(inner, item.trim()))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
    }
}

pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int64(n) => n.to_string(),
        Value::Float64(n) => n.to_string(),
        Value::Numeric(d) => d.normalize().to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(b) => format!("0x{}", hex::encode_upper(b)),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        Value::Json(j) => j.to_string(),
        Value::Uuid(u) => u.to_string(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(value_to_string).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn parse_bool(token: &str) -> Result<bool> {
    match token.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::TypeMismatch(format!("Expected bool but got '{token}'"))),
    }
}

fn parse_timestamp(token: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(token, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| {
            Error::TypeMismatch(format!(
                "Expected timestamp 'YYYY-MM-DD HH:MM:SS' but got '{token}'"
            ))
        })
}
