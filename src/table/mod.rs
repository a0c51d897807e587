//! Virtual tables
//!
//! A table is a named set of columns over one kind of backing struct and a
//! producer of rows under the core lock. Query answering is generic: every
//! table shares [`Table::answer_query`].
//!
//! # Visibility
//!
//! Rows the user may not see are dropped before the filter runs. A table
//! the user may not see answers with an empty result.

mod columns;
mod hosts;
mod registry;
mod services;
mod status;

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::User;
use crate::column::{Column, ColumnSet, Row};
use crate::core::{Core, CoreState};
use crate::filter::Filter;
use crate::query::{Query, QueryResult};

pub use columns::{ColumnInfo, ColumnsTable};
pub use hosts::HostsTable;
pub use registry::TableRegistry;
pub use services::ServicesTable;
pub use status::{StatusRow, StatusTable};

/// Equality restrictions a scan may use to skip rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanHint {
    restrictions: HashMap<String, String>,
}

impl ScanHint {
    /// No restriction, full scan
    pub fn none() -> Self {
        Self::default()
    }

    /// Collects `column = literal` conjuncts of `filter` for `columns`
    pub fn from_filter(filter: &Filter, columns: &[&str]) -> Self {
        let restrictions = columns
            .iter()
            .filter_map(|&name| {
                filter
                    .string_value_restriction(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        Self { restrictions }
    }

    pub fn restriction(&self, column: &str) -> Option<&str> {
        self.restrictions.get(column).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }
}

/// Row producer callback. Returning false stops the scan.
pub type Visitor<'v> = dyn for<'r> FnMut(Row<'r>) -> bool + 'v;

pub trait Table: Send + Sync {
    fn name(&self) -> &str;

    /// Prefix that may be stripped from column names (`host_`)
    fn name_prefix(&self) -> &str;

    fn columns(&self) -> &ColumnSet;

    /// Exact name first, then the name without the table prefix
    fn column(&self, name: &str) -> Option<Arc<Column>> {
        let columns = self.columns();
        columns
            .get(name)
            .or_else(|| {
                name.strip_prefix(self.name_prefix())
                    .filter(|_| !self.name_prefix().is_empty())
                    .and_then(|stripped| columns.get(stripped))
            })
            .cloned()
    }

    /// Sentinel row every column resolves against to its zero value
    fn get_default(&self) -> Row<'static> {
        Row::null()
    }

    fn core(&self) -> &dyn Core;

    /// String columns whose `=` restriction narrows the scan
    fn indexed_columns(&self) -> &[&'static str] {
        &[]
    }

    /// Visits every row of the current state, or fewer under `hint`
    fn for_each_row(&self, state: &CoreState, hint: &ScanHint, visit: &mut Visitor<'_>);

    fn is_authorized(&self, _user: &dyn User, _row: Row<'_>) -> bool {
        true
    }

    /// Drives `query` through one scan of this table and renders it
    fn answer_query(&self, query: &mut Query, user: &dyn User) -> QueryResult<()> {
        if !user.is_authorized_for_table(self.name()) {
            query.begin_scan()?;
            return query.finish();
        }

        let hint = ScanHint::from_filter(query.filter(), self.indexed_columns());
        {
            let state = self.core().read_state()?;
            query.begin_scan()?;
            self.for_each_row(&state, &hint, &mut |row| {
                if !self.is_authorized(user, row) {
                    return true;
                }
                query.process_dataset(row)
            });
        }
        query.finish()
    }
}
