use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Largest declared length for STRING columns, in characters.
pub const MAX_STRING_LENGTH: i64 = 2_621_440;
/// Largest declared length for BYTES columns, in bytes.
pub const MAX_BYTES_LENGTH: i64 = 10_485_760;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Int64,
    Float64,
    Numeric,
    String,
    Bytes,
    Date,
    Timestamp,
    Json,
    Uuid,
    Array(Box<DataType>),
}

impl DataType {
    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(_))
    }

    /// Element type for arrays, the type itself otherwise.
    pub fn base_type(&self) -> &DataType {
        match self {
            DataType::Array(inner) => inner.base_type(),
            other => other,
        }
    }

    /// Whether a declared maximum length applies to this type.
    pub fn supports_length(&self) -> bool {
        matches!(self.base_type(), DataType::String | DataType::Bytes)
    }

    pub fn max_length_limit(&self) -> Option<i64> {
        match self.base_type() {
            DataType::String => Some(MAX_STRING_LENGTH),
            DataType::Bytes => Some(MAX_BYTES_LENGTH),
            _ => None,
        }
    }

    /// Types that may not participate in primary or index keys.
    pub fn is_keyable(&self) -> bool {
        !matches!(self, DataType::Array(_) | DataType::Json)
    }

    /// Renders the SQL name, with an optional declared length.
    pub fn sql_name(&self, max_length: Option<i64>) -> String {
        let length = |n: Option<i64>| match n {
            Some(n) => n.to_string(),
            None => "MAX".to_string(),
        };
        match self {
            DataType::Bool => "BOOL".to_string(),
            DataType::Int64 => "INT64".to_string(),
            DataType::Float64 => "FLOAT64".to_string(),
            DataType::Numeric => "NUMERIC".to_string(),
            DataType::String => format!("STRING({})", length(max_length)),
            DataType::Bytes => format!("BYTES({})", length(max_length)),
            DataType::Date => "DATE".to_string(),
            DataType::Timestamp => "TIMESTAMP".to_string(),
            DataType::Json => "JSON".to_string(),
            DataType::Uuid => "UUID".to_string(),
            DataType::Array(inner) => format!("ARRAY<{}>", inner.sql_name(max_length)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name(None))
    }
}

pub fn parse_datatype(s: &str) -> Result<DataType> {
    let upper = s.trim().to_ascii_uppercase();
    if let Some(inner) = upper
        .strip_prefix("ARRAY<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return Ok(DataType::Array(Box::new(parse_datatype(inner)?)));
    }
    let base = upper.split('(').next().unwrap_or_default();
    match base {
        "BOOL" => Ok(DataType::Bool),
        "INT64" => Ok(DataType::Int64),
        "FLOAT64" => Ok(DataType::Float64),
        "NUMERIC" => Ok(DataType::Numeric),
        "STRING" => Ok(DataType::String),
        "BYTES" => Ok(DataType::Bytes),
        "DATE" => Ok(DataType::Date),
        "TIMESTAMP" => Ok(DataType::Timestamp),
        "JSON" => Ok(DataType::Json),
        "UUID" => Ok(DataType::Uuid),
        other => Err(Error::InvalidArgument(format!(
            "Unknown type '{other}'. Use bool|int64|float64|numeric|string|bytes|date|timestamp|json|uuid|array<..>"
        ))),
    }
}
