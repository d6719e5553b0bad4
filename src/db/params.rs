//! Positional parameter values for parameterized statements.
//!
//! Parameters are always bound through sqlx; they are never concatenated
//! into the statement text.

use serde::{Deserialize, Serialize};
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl SqlParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for SqlParam {
    fn from(v: u64) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::String(v) => query.bind(v.as_str()),
        SqlParam::Bytes(v) => query.bind(v.as_slice()),
    }
}

/// Build a MySQL query with all parameters bound in order.
pub(crate) fn build_query<'q>(
    sql: &'q str,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_param(query, param);
    }
    query
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
