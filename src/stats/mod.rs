//! Stats evaluation
//!
//! A stats query folds every row that passes the main filter into
//! per-group accumulators. The group key is the value tuple of the
//! `Columns:` list; without group columns there is exactly one group, even
//! when no row matched.
//!
//! Every supported aggregate is order independent, so a table may scan its
//! rows in any order, or in partitions merged afterwards, with the same
//! result.

mod aggregation;
mod groups;

use std::sync::Arc;

use crate::column::{Column, Row, Value};

pub use aggregation::{Accumulator, AggregationOp, StatsSpec};
pub use groups::StatsGroups;

/// Group columns, stats columns and their running groups
#[derive(Debug, Clone)]
pub struct StatsEvaluator {
    group_by: Vec<Arc<Column>>,
    specs: Vec<StatsSpec>,
    groups: StatsGroups,
}

impl StatsEvaluator {
    pub fn new(group_by: Vec<Arc<Column>>, specs: Vec<StatsSpec>) -> Self {
        Self {
            group_by,
            specs,
            groups: StatsGroups::new(),
        }
    }

    pub fn group_by(&self) -> &[Arc<Column>] {
        &self.group_by
    }

    pub fn specs(&self) -> &[StatsSpec] {
        &self.specs
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Folds one row into its group
    pub fn consume(&mut self, row: Row<'_>) {
        let key: Vec<Value> = self.group_by.iter().map(|column| column.value(row)).collect();
        let accumulators = self.groups.group_mut(key, &self.specs);
        for (acc, spec) in accumulators.iter_mut().zip(&self.specs) {
            acc.consume(spec, row);
        }
    }

    /// An empty evaluator with the same columns, for partial scans
    pub fn partial(&self) -> Self {
        Self::new(self.group_by.clone(), self.specs.clone())
    }

    pub fn merge(&mut self, other: StatsEvaluator) {
        self.groups.merge(other.groups, &self.specs);
    }

    /// Result rows in first-seen group order
    pub fn into_rows(mut self) -> Vec<Vec<Value>> {
        if self.group_by.is_empty() && self.groups.is_empty() {
            self.groups.group_mut(Vec::new(), &self.specs);
        }
        self.groups.into_rows()
    }
}
