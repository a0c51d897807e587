//! Column subsystem
//!
//! Columns are typed accessors bound once at table construction. Filters,
//! stats and renderers only ever talk to [`Column`] and [`Row`], which is
//! what lets one evaluation path serve every table.

mod column;
mod counter_columns;
mod offsets;
mod types;

pub use column::{Column, ColumnSet};
pub use counter_columns::add_counter_columns;
pub use offsets::{ColumnOffsets, Row};
pub use types::{ColumnType, Value};
