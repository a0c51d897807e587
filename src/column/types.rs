//! Column types and typed values
//!
//! Supported column types:
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - string: UTF-8 string
//! - time: UTC timestamp, rendered as Unix seconds
//! - list: list of strings
//! - blob: raw bytes

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Double,
    String,
    Time,
    List,
    Blob,
}

impl ColumnType {
    /// Type name as listed by the `columns` table
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Double => "float",
            ColumnType::String => "string",
            ColumnType::Time => "time",
            ColumnType::List => "list",
            ColumnType::Blob => "blob",
        }
    }

    /// Columns usable by aggregating stats
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Double | ColumnType::Time)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A resolved column value or an aggregate result
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (aggregate over no rows)
    Null,
    Int(i64),
    Double(f64),
    String(String),
    Time(DateTime<Utc>),
    List(Vec<String>),
    Blob(Vec<u8>),
}

impl Value {
    /// Zero value of a column type, used for sentinel rows
    pub fn zero(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int => Value::Int(0),
            ColumnType::Double => Value::Double(0.0),
            ColumnType::String => Value::String(String::new()),
            ColumnType::Time => Value::Time(DateTime::<Utc>::default()),
            ColumnType::List => Value::List(Vec::new()),
            ColumnType::Blob => Value::Blob(Vec::new()),
        }
    }

    /// Type of this value, `None` for `Null`
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Int),
            Value::Double(_) => Some(ColumnType::Double),
            Value::String(_) => Some(ColumnType::String),
            Value::Time(_) => Some(ColumnType::Time),
            Value::List(_) => Some(ColumnType::List),
            Value::Blob(_) => Some(ColumnType::Blob),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by aggregation
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            Value::Time(t) => Some(t.timestamp() as f64),
            _ => None,
        }
    }

    /// Total order used for sorting.
    ///
    /// Null sorts first. Values of different types order by type rank.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Double(_) | Value::Time(_) => 1,
                Value::String(_) => 2,
                Value::List(_) => 3,
                Value::Blob(_) => 4,
            }
        }

        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }
}
