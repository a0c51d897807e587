//! Leaf comparisons against one column
//!
//! The literal is parsed and validated against the column type once, when the
//! filter is built. Evaluation never fails: a row either matches or it does not.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::column::{Column, ColumnType, Row, Value};
use crate::query::{QueryError, QueryResult};

use super::operator::RelationalOperator;

/// Pre-compiled operand, specialised on column type and operator
#[derive(Debug, Clone)]
enum Operand {
    /// Int and Time columns (Time compares Unix seconds)
    Int(i64),
    Double(f64),
    Text(String),
    /// Lowercased literal for `=~ !=~`
    TextIcase(String),
    Regex(Regex),
    ListEmpty,
    ListContains(String),
    /// Lowercased element for `<= >` on lists
    ListContainsIcase(String),
    ListAnyMatches(Regex),
    ListAnyEqualsIcase(String),
}

/// `<column> <op> <literal>`
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    column: Arc<Column>,
    op: RelationalOperator,
    literal: String,
    operand: Operand,
}

impl ColumnFilter {
    /// Builds a comparison, rejecting operators the column type does not
    /// support and literals that do not parse as that type.
    pub fn new(
        column: Arc<Column>,
        op: RelationalOperator,
        literal: impl Into<String>,
        regex_size_limit: usize,
    ) -> QueryResult<Self> {
        let literal = literal.into();
        let operand = Self::compile(&column, op, &literal, regex_size_limit)?;
        Ok(Self {
            column,
            op,
            literal,
            operand,
        })
    }

    fn compile(
        column: &Column,
        op: RelationalOperator,
        literal: &str,
        regex_size_limit: usize,
    ) -> QueryResult<Operand> {
        let mismatch = || QueryError::TypeMismatch {
            column: column.name().to_string(),
            column_type: column.column_type(),
            operator: op.as_str().to_string(),
        };

        match column.column_type() {
            ColumnType::Int | ColumnType::Time => {
                if op.is_regex() || op.is_case_insensitive() {
                    return Err(mismatch());
                }
                literal
                    .trim()
                    .parse::<i64>()
                    .map(Operand::Int)
                    .map_err(|_| QueryError::malformed("integer", literal))
            }
            ColumnType::Double => {
                if op.is_regex() || op.is_case_insensitive() {
                    return Err(mismatch());
                }
                literal
                    .trim()
                    .parse::<f64>()
                    .map(Operand::Double)
                    .map_err(|_| QueryError::malformed("float", literal))
            }
            ColumnType::String => Ok(if op.is_regex() {
                Operand::Regex(compile_regex(literal, op.is_case_insensitive(), regex_size_limit)?)
            } else if op.is_case_insensitive() {
                Operand::TextIcase(literal.to_lowercase())
            } else {
                Operand::Text(literal.to_string())
            }),
            ColumnType::List => match op {
                RelationalOperator::Equal | RelationalOperator::NotEqual => {
                    if literal.is_empty() {
                        Ok(Operand::ListEmpty)
                    } else {
                        Err(QueryError::malformed("empty list", literal))
                    }
                }
                RelationalOperator::GreaterOrEqual | RelationalOperator::Less => {
                    Ok(Operand::ListContains(literal.to_string()))
                }
                RelationalOperator::LessOrEqual | RelationalOperator::Greater => {
                    Ok(Operand::ListContainsIcase(literal.to_lowercase()))
                }
                RelationalOperator::EqualIcase | RelationalOperator::DoesntEqualIcase => {
                    Ok(Operand::ListAnyEqualsIcase(literal.to_lowercase()))
                }
                _ => Ok(Operand::ListAnyMatches(compile_regex(
                    literal,
                    op.is_case_insensitive(),
                    regex_size_limit,
                )?)),
            },
            ColumnType::Blob => Err(mismatch()),
        }
    }

    pub fn column(&self) -> &Arc<Column> {
        &self.column
    }

    pub fn column_name(&self) -> &str {
        self.column.name()
    }

    pub fn op(&self) -> RelationalOperator {
        self.op
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn accepts(&self, row: Row<'_>) -> bool {
        let value = self.column.value(row);
        match (&self.operand, &value) {
            (Operand::Int(expected), Value::Int(actual)) => self.ordering(actual.cmp(expected)),
            (Operand::Int(expected), Value::Time(actual)) => {
                self.ordering(actual.timestamp().cmp(expected))
            }
            (Operand::Double(expected), Value::Double(actual)) => {
                match actual.partial_cmp(expected) {
                    Some(ordering) => self.ordering(ordering),
                    // NaN is unequal to everything and unordered
                    None => self.op == RelationalOperator::NotEqual,
                }
            }
            (Operand::Text(expected), Value::String(actual)) => {
                self.ordering(actual.as_str().cmp(expected.as_str()))
            }
            (Operand::TextIcase(expected), Value::String(actual)) => {
                self.positive(actual.to_lowercase() == *expected)
            }
            (Operand::Regex(regex), Value::String(actual)) => self.positive(regex.is_match(actual)),
            (Operand::ListEmpty, Value::List(items)) => self.positive(items.is_empty()),
            (Operand::ListContains(element), Value::List(items)) => {
                self.positive(items.iter().any(|item| item == element))
            }
            (Operand::ListContainsIcase(element), Value::List(items)) => {
                self.positive(items.iter().any(|item| item.to_lowercase() == *element))
            }
            (Operand::ListAnyMatches(regex), Value::List(items)) => {
                self.positive(items.iter().any(|item| regex.is_match(item)))
            }
            (Operand::ListAnyEqualsIcase(element), Value::List(items)) => {
                self.positive(items.iter().any(|item| item.to_lowercase() == *element))
            }
            // Resolution always yields the declared type, so this is unreachable
            // for well-formed rows. Fail closed.
            _ => false,
        }
    }

    /// Applies an ordering operator (also `=` and `!=`)
    fn ordering(&self, ordering: Ordering) -> bool {
        match self.op {
            RelationalOperator::Equal => ordering == Ordering::Equal,
            RelationalOperator::NotEqual => ordering != Ordering::Equal,
            RelationalOperator::Less => ordering == Ordering::Less,
            RelationalOperator::LessOrEqual => ordering != Ordering::Greater,
            RelationalOperator::Greater => ordering == Ordering::Greater,
            RelationalOperator::GreaterOrEqual => ordering != Ordering::Less,
            _ => false,
        }
    }

    /// Result of the positive form of the operator, flipped for negative ones.
    ///
    /// For lists `>` and `<` are the negative forms of `<=` and `>=`.
    fn positive(&self, matched: bool) -> bool {
        let negative = match self.op {
            RelationalOperator::Less | RelationalOperator::Greater => true,
            RelationalOperator::GreaterOrEqual | RelationalOperator::LessOrEqual => false,
            op => op.is_negative(),
        };
        matched != negative
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column.name(), self.op, self.literal)
    }
}

fn compile_regex(pattern: &str, case_insensitive: bool, size_limit: usize) -> QueryResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .size_limit(size_limit)
        .build()
        .map_err(|e| QueryError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnOffsets;
    use chrono::{TimeZone, Utc};

    const LIMIT: usize = 1 << 20;

    struct Fixture {
        name: String,
        state: i64,
        latency: f64,
        groups: Vec<String>,
        checked_at: i64,
    }

    fn fixture() -> Fixture {
        Fixture {
            name: "WebServer01".into(),
            state: 2,
            latency: 0.25,
            groups: vec!["Linux".into(), "web".into()],
            checked_at: 1_000,
        }
    }

    fn column(name: &str) -> Arc<Column> {
        let o = ColumnOffsets::new();
        Arc::new(match name {
            "name" => Column::string("name", "", o, |p: &Fixture| p.name.clone()),
            "state" => Column::int("state", "", o, |p: &Fixture| p.state),
            "latency" => Column::double("latency", "", o, |p: &Fixture| p.latency),
            "groups" => Column::list("groups", "", o, |p: &Fixture| p.groups.clone()),
            "checked_at" => Column::time("checked_at", "", o, |p: &Fixture| {
                Utc.timestamp_opt(p.checked_at, 0).single().unwrap_or_default()
            }),
            _ => Column::blob("raw", "", o, |_: &Fixture| vec![0u8]),
        })
    }

    fn check(col: &str, op: &str, literal: &str) -> bool {
        let p = fixture();
        ColumnFilter::new(column(col), RelationalOperator::parse(op).unwrap(), literal, LIMIT)
            .unwrap()
            .accepts(Row::new(&p))
    }

    fn build_err(col: &str, op: &str, literal: &str) -> QueryError {
        let op = RelationalOperator::parse(op).unwrap();
        ColumnFilter::new(column(col), op, literal, LIMIT).unwrap_err()
    }

    #[test]
    fn test_int_ordering() {
        assert!(check("state", "=", "2"));
        assert!(check("state", "!=", "0"));
        assert!(check("state", ">", "1"));
        assert!(check("state", ">=", "2"));
        assert!(!check("state", "<", "2"));
        assert!(check("state", "<=", " 2 "));
    }

    #[test]
    fn test_double_and_time() {
        assert!(check("latency", "<", "0.5"));
        assert!(!check("latency", "=", "1"));
        assert!(check("checked_at", ">=", "1000"));
        assert!(check("checked_at", "<", "1001"));
    }

    #[test]
    fn test_string_operators() {
        assert!(check("name", "=", "WebServer01"));
        assert!(!check("name", "=", "webserver01"));
        assert!(check("name", "=~", "webserver01"));
        assert!(!check("name", "!=~", "WEBSERVER01"));
        assert!(check("name", "~", "^Web"));
        assert!(!check("name", "~", "^web"));
        assert!(check("name", "~~", "^web"));
        assert!(check("name", "!~", "db"));
        assert!(check("name", "<", "Xyz"));
        assert!(check("name", ">", "Aaa"));
    }

    #[test]
    fn test_list_operators() {
        assert!(check("groups", ">=", "web"));
        assert!(!check("groups", ">=", "Web"));
        assert!(check("groups", "<=", "LINUX"));
        assert!(check("groups", "<", "db"));
        assert!(!check("groups", ">", "linux"));
        assert!(check("groups", "!=", ""));
        assert!(!check("groups", "=", ""));
        assert!(check("groups", "~", "^we"));
        assert!(check("groups", "=~", "WEB"));
    }

    #[test]
    fn test_type_mismatches_rejected_at_construction() {
        assert!(matches!(build_err("state", "~", "2"), QueryError::TypeMismatch { .. }));
        assert!(matches!(build_err("latency", "=~", "1"), QueryError::TypeMismatch { .. }));
        assert!(matches!(build_err("raw", "=", ""), QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_malformed_literals() {
        assert!(matches!(build_err("state", "=", "two"), QueryError::MalformedLiteral { .. }));
        assert!(matches!(build_err("latency", ">", ""), QueryError::MalformedLiteral { .. }));
        assert!(matches!(build_err("groups", "=", "web"), QueryError::MalformedLiteral { .. }));
    }

    #[test]
    fn test_invalid_and_oversized_regex() {
        assert!(matches!(build_err("name", "~", "(unclosed"), QueryError::InvalidRegex { .. }));

        let pattern = "\\w{1000}\\w{1000}";
        let huge = ColumnFilter::new(column("name"), RelationalOperator::Matches, pattern, 1024);
        assert!(matches!(huge, Err(QueryError::InvalidRegex { .. })));
    }

    #[test]
    fn test_sentinel_row_compares_zero_values() {
        let filter =
            ColumnFilter::new(column("state"), RelationalOperator::Equal, "0", LIMIT).unwrap();
        assert!(filter.accepts(Row::null()));
        let filter =
            ColumnFilter::new(column("groups"), RelationalOperator::Equal, "", LIMIT).unwrap();
        assert!(filter.accepts(Row::null()));
    }

    #[test]
    fn test_display() {
        let filter =
            ColumnFilter::new(column("name"), RelationalOperator::MatchesIcase, "web", LIMIT)
                .unwrap();
        assert_eq!(filter.to_string(), "name ~~ web");
    }
}
