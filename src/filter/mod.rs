//! Filter trees
//!
//! A [`Filter`] is built once per query from the `Filter:`/`And:`/`Or:`/
//! `Negate:` header stack and evaluated against every row of the scan.
//!
//! # Evaluation
//!
//! - `And` stops at the first rejecting child, `Or` at the first accepting one
//! - `Not` has exactly one child
//! - An empty `And` accepts everything, an empty `Or` rejects everything
//! - Evaluation is pure: the same row under the same lock gives the same answer

mod comparison;
mod operator;

use std::fmt;

use serde_json::{json, Value as JsonValue};

use crate::column::{ColumnType, Row};

pub use comparison::ColumnFilter;
pub use operator::RelationalOperator;

/// Boolean predicate over one row
#[derive(Debug, Clone)]
pub enum Filter {
    Comparison(ColumnFilter),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn always_true() -> Self {
        Filter::And(Vec::new())
    }

    pub fn always_false() -> Self {
        Filter::Or(Vec::new())
    }

    pub fn negated(self) -> Self {
        Filter::Not(Box::new(self))
    }

    pub fn accepts(&self, row: Row<'_>) -> bool {
        match self {
            Filter::Comparison(leaf) => leaf.accepts(row),
            Filter::And(children) => children.iter().all(|child| child.accepts(row)),
            Filter::Or(children) => children.iter().any(|child| child.accepts(row)),
            Filter::Not(child) => !child.accepts(row),
        }
    }

    /// Literal a string column is pinned to by an `=` comparison that every
    /// accepted row must satisfy. Tables use it to narrow a scan.
    pub fn string_value_restriction(&self, column_name: &str) -> Option<&str> {
        match self {
            Filter::Comparison(leaf) => {
                let column = leaf.column();
                (leaf.op() == RelationalOperator::Equal
                    && column.column_type() == ColumnType::String
                    && column.name() == column_name)
                    .then(|| leaf.literal())
            }
            Filter::And(children) => children
                .iter()
                .find_map(|child| child.string_value_restriction(column_name)),
            // A disjunction or negation pins nothing in general
            Filter::Or(_) | Filter::Not(_) => None,
        }
    }

    /// Plan form used by `explain`
    pub fn to_json(&self) -> JsonValue {
        match self {
            Filter::Comparison(leaf) => json!({
                "column": leaf.column_name(),
                "op": leaf.op().as_str(),
                "literal": leaf.literal(),
            }),
            Filter::And(children) => {
                json!({ "and": children.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Or(children) => {
                json!({ "or": children.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Not(child) => json!({ "not": child.to_json() }),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(
            f: &mut fmt::Formatter<'_>,
            children: &[Filter],
            sep: &str,
            empty: &str,
        ) -> fmt::Result {
            if children.is_empty() {
                return f.write_str(empty);
            }
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", child)?;
            }
            f.write_str(")")
        }

        match self {
            Filter::Comparison(leaf) => write!(f, "{}", leaf),
            Filter::And(children) => join(f, children, " and ", "true"),
            Filter::Or(children) => join(f, children, " or ", "false"),
            Filter::Not(child) => write!(f, "not {}", child),
        }
    }
}
