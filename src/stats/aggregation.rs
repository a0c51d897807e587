//! Stats specifications and their running accumulators
//!
//! Every accumulator folds rows with a commutative, associative rule and can
//! be merged with a partial accumulator built over another row subset.
//! Integer sums are exact; anything accumulated in `f64` is order
//! independent up to rounding.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::column::{Column, ColumnType, Row, Value};
use crate::filter::Filter;
use crate::query::{QueryError, QueryResult};

/// Aggregation operator of a `Stats: <op> <column>` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOp {
    Sum,
    Min,
    Max,
    Avg,
    Std,
    SumInv,
    AvgInv,
}

impl AggregationOp {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "avg" => Some(Self::Avg),
            "std" => Some(Self::Std),
            "suminv" => Some(Self::SumInv),
            "avginv" => Some(Self::AvgInv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Std => "std",
            Self::SumInv => "suminv",
            Self::AvgInv => "avginv",
        }
    }
}

impl fmt::Display for AggregationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `Stats:` output column
#[derive(Debug, Clone)]
pub enum StatsSpec {
    /// Number of rows accepted by the filter
    Count(Filter),
    /// Numeric aggregate over a column
    Aggregate { op: AggregationOp, column: Arc<Column> },
}

impl StatsSpec {
    /// Builds an aggregate, rejecting non-numeric columns
    pub fn aggregate(op: AggregationOp, column: Arc<Column>) -> QueryResult<Self> {
        if !column.column_type().is_numeric() {
            return Err(QueryError::TypeMismatch {
                column: column.name().to_string(),
                column_type: column.column_type(),
                operator: op.as_str().to_string(),
            });
        }
        Ok(Self::Aggregate { op, column })
    }

    pub fn accumulator(&self) -> Accumulator {
        match self {
            StatsSpec::Count(_) => Accumulator::Count(0),
            StatsSpec::Aggregate { op, column } => match op {
                AggregationOp::Sum if column.column_type() != ColumnType::Double => {
                    Accumulator::IntSum(0)
                }
                AggregationOp::Sum => Accumulator::Sum(0.0),
                AggregationOp::Min => Accumulator::Min(None),
                AggregationOp::Max => Accumulator::Max(None),
                AggregationOp::Avg => Accumulator::Avg { count: 0, sum: 0.0 },
                AggregationOp::Std => Accumulator::Std {
                    count: 0,
                    sum: 0.0,
                    sum_of_squares: 0.0,
                },
                AggregationOp::SumInv => Accumulator::SumInv(0.0),
                AggregationOp::AvgInv => Accumulator::AvgInv { count: 0, sum: 0.0 },
            },
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            StatsSpec::Count(filter) => json!({ "count": filter.to_json() }),
            StatsSpec::Aggregate { op, column } => {
                json!({ "op": op.as_str(), "column": column.name() })
            }
        }
    }
}

impl fmt::Display for StatsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsSpec::Count(filter) => write!(f, "count {}", filter),
            StatsSpec::Aggregate { op, column } => write!(f, "{} {}", op, column.name()),
        }
    }
}

/// Running state of one stats column for one group
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count(u64),
    /// Exact sum over Int and Time columns
    IntSum(i128),
    /// Sum over a Double column. Float addition rounds, so permuted input
    /// may differ in the last bits.
    Sum(f64),
    Min(Option<f64>),
    Max(Option<f64>),
    Avg { count: u64, sum: f64 },
    Std { count: u64, sum: f64, sum_of_squares: f64 },
    SumInv(f64),
    AvgInv { count: u64, sum: f64 },
}

impl Accumulator {
    /// Folds one row. `spec` must be the spec this accumulator was created from.
    pub fn consume(&mut self, spec: &StatsSpec, row: Row<'_>) {
        match (self, spec) {
            (Accumulator::Count(count), StatsSpec::Count(filter)) => {
                if filter.accepts(row) {
                    *count += 1;
                }
            }
            (Accumulator::IntSum(sum), StatsSpec::Aggregate { column, .. }) => {
                match column.value(row) {
                    Value::Int(value) => *sum += i128::from(value),
                    Value::Time(time) => *sum += i128::from(time.timestamp()),
                    _ => {}
                }
            }
            (acc, StatsSpec::Aggregate { column, .. }) => {
                if let Some(value) = column.value(row).as_f64() {
                    acc.add(value);
                }
            }
            _ => {}
        }
    }

    fn add(&mut self, value: f64) {
        match self {
            Accumulator::Count(count) => *count += 1,
            Accumulator::IntSum(sum) => *sum += value as i128,
            Accumulator::Sum(sum) => *sum += value,
            Accumulator::Min(min) => *min = Some(min.map_or(value, |m| m.min(value))),
            Accumulator::Max(max) => *max = Some(max.map_or(value, |m| m.max(value))),
            Accumulator::Avg { count, sum } => {
                *count += 1;
                *sum += value;
            }
            Accumulator::Std {
                count,
                sum,
                sum_of_squares,
            } => {
                *count += 1;
                *sum += value;
                *sum_of_squares += value * value;
            }
            // Zero values have no inverse and are skipped
            Accumulator::SumInv(sum) => {
                if value != 0.0 {
                    *sum += 1.0 / value;
                }
            }
            Accumulator::AvgInv { count, sum } => {
                if value != 0.0 {
                    *count += 1;
                    *sum += 1.0 / value;
                }
            }
        }
    }

    /// Combines a partial accumulator of the same kind
    pub fn merge(&mut self, other: &Accumulator) {
        match (self, other) {
            (Accumulator::Count(a), Accumulator::Count(b)) => *a += b,
            (Accumulator::IntSum(a), Accumulator::IntSum(b)) => *a += b,
            (Accumulator::Sum(a), Accumulator::Sum(b)) => *a += b,
            (Accumulator::SumInv(a), Accumulator::SumInv(b)) => *a += b,
            (Accumulator::Min(a), Accumulator::Min(b)) => {
                *a = match (*a, *b) {
                    (Some(x), Some(y)) => Some(x.min(y)),
                    (x, y) => x.or(y),
                }
            }
            (Accumulator::Max(a), Accumulator::Max(b)) => {
                *a = match (*a, *b) {
                    (Some(x), Some(y)) => Some(x.max(y)),
                    (x, y) => x.or(y),
                }
            }
            (Accumulator::Avg { count, sum }, Accumulator::Avg { count: c, sum: s })
            | (Accumulator::AvgInv { count, sum }, Accumulator::AvgInv { count: c, sum: s }) => {
                *count += c;
                *sum += s;
            }
            (
                Accumulator::Std {
                    count,
                    sum,
                    sum_of_squares,
                },
                Accumulator::Std {
                    count: c,
                    sum: s,
                    sum_of_squares: q,
                },
            ) => {
                *count += c;
                *sum += s;
                *sum_of_squares += q;
            }
            _ => {}
        }
    }

    /// Final value. Count is an integer, every aggregate a double; an
    /// aggregate without input rows is `Null` where zero would be a lie.
    pub fn result(&self) -> Value {
        match *self {
            Accumulator::Count(count) => Value::Int(count as i64),
            Accumulator::IntSum(sum) => Value::Double(sum as f64),
            Accumulator::Sum(sum) | Accumulator::SumInv(sum) => Value::Double(sum),
            Accumulator::Min(value) | Accumulator::Max(value) => {
                value.map_or(Value::Null, Value::Double)
            }
            Accumulator::Avg { count, sum } | Accumulator::AvgInv { count, sum } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Double(sum / count as f64)
                }
            }
            Accumulator::Std {
                count,
                sum,
                sum_of_squares,
            } => {
                if count == 0 {
                    return Value::Null;
                }
                let n = count as f64;
                let mean = sum / n;
                let variance = (sum_of_squares / n - mean * mean).max(0.0);
                Value::Double(variance.sqrt())
            }
        }
    }
}
