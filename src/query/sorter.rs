//! Result sorting for `OrderBy:`
//!
//! Sort is stable: rows with equal keys keep scan (or first-seen group)
//! order.

use std::cmp::Ordering;

use serde::Serialize;

use crate::column::Value;

use super::errors::{QueryError, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(token: &str) -> QueryResult<Self> {
        match token {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(QueryError::invalid_header(format!("unknown sort direction '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A projected row with the values it sorts by
#[derive(Debug, Clone, PartialEq)]
pub struct SortableRow {
    pub values: Vec<Value>,
    pub sort_key: Vec<Value>,
}

/// Sorts result rows
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts by `sort_key`, one direction per key position
    pub fn sort(rows: &mut [SortableRow], directions: &[SortDirection]) {
        if directions.is_empty() {
            return;
        }
        rows.sort_by(|a, b| Self::compare_keys(&a.sort_key, &b.sort_key, directions));
    }

    /// Sorts grouped rows in place by the values at `positions`
    pub fn sort_by_positions(rows: &mut [Vec<Value>], positions: &[(usize, SortDirection)]) {
        if positions.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            positions
                .iter()
                .map(|&(pos, direction)| Self::directed(Self::compare_at(a, b, pos), direction))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    fn compare_keys(a: &[Value], b: &[Value], directions: &[SortDirection]) -> Ordering {
        a.iter()
            .zip(b)
            .zip(directions)
            .map(|((x, y), &direction)| Self::directed(x.sort_cmp(y), direction))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    fn compare_at(a: &[Value], b: &[Value], pos: usize) -> Ordering {
        match (a.get(pos), b.get(pos)) {
            (Some(x), Some(y)) => x.sort_cmp(y),
            _ => Ordering::Equal,
        }
    }

    fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}
