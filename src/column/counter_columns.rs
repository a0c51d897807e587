//! Procedural counter column family

use crate::core::{Counter, CounterSnapshot};

use super::column::{Column, ColumnSet};
use super::offsets::ColumnOffsets;

/// Registers the column pair for one core counter.
///
/// - `<name>` (int): total since program start
/// - `<name>_rate` (float): averaged per-second rate
///
/// `offsets` must lead from the table row to a [`CounterSnapshot`].
pub fn add_counter_columns(
    columns: &mut ColumnSet,
    name: &str,
    description: &str,
    offsets: &ColumnOffsets,
    which: Counter,
) {
    columns.add(Column::int(
        name,
        format!("The number of {} since program start", description),
        offsets.clone(),
        move |counters: &CounterSnapshot| counters.value(which) as i64,
    ));
    columns.add(Column::double(
        format!("{}_rate", name),
        format!("The averaged number of {} per second", description),
        offsets.clone(),
        move |counters: &CounterSnapshot| counters.rate(which),
    ));
}
