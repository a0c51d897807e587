//! `status` table: one row of global program status and counters

use std::sync::Arc;

use crate::column::{add_counter_columns, Column, ColumnOffsets, ColumnSet, Row};
use crate::core::{Core, CoreState, Counter, CounterSnapshot, ProgramStatus};

use super::{ScanHint, Table, Visitor};

/// The single status row, captured under the core lock
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub program: ProgramStatus,
    pub num_hosts: usize,
    pub num_services: usize,
    pub counters: CounterSnapshot,
}

fn status_program(row: &StatusRow) -> Option<&ProgramStatus> {
    Some(&row.program)
}

fn status_counters(row: &StatusRow) -> Option<&CounterSnapshot> {
    Some(&row.counters)
}

pub struct StatusTable {
    columns: ColumnSet,
    core: Arc<dyn Core>,
}

impl StatusTable {
    pub fn new(core: Arc<dyn Core>) -> Self {
        let mut columns = ColumnSet::new();

        let counters = ColumnOffsets::new().add(status_counters);
        for counter in Counter::ALL {
            add_counter_columns(
                &mut columns,
                counter.column_name(),
                counter.description(),
                &counters,
                counter,
            );
        }

        let p = || ColumnOffsets::new().add(status_program);
        columns.add(Column::string(
            "program_version",
            "The version of the monitoring daemon",
            p(),
            |s: &ProgramStatus| s.program_version.clone(),
        ));
        columns.add(Column::time(
            "program_start",
            "The time of the last program start",
            p(),
            |s: &ProgramStatus| s.program_start,
        ));
        columns.add(Column::int(
            "nagios_pid",
            "The process ID of the monitoring core",
            p(),
            |s: &ProgramStatus| s.pid,
        ));
        columns.add(Column::int(
            "interval_length",
            "The default interval length",
            p(),
            |s: &ProgramStatus| s.interval_length,
        ));
        columns.add(Column::bool(
            "enable_notifications",
            "Whether notifications are enabled in general (0/1)",
            p(),
            |s: &ProgramStatus| s.enable_notifications,
        ));
        columns.add(Column::bool(
            "execute_service_checks",
            "Whether active service checks are activated in general (0/1)",
            p(),
            |s: &ProgramStatus| s.execute_service_checks,
        ));
        columns.add(Column::bool(
            "execute_host_checks",
            "Whether host checks are executed in general (0/1)",
            p(),
            |s: &ProgramStatus| s.execute_host_checks,
        ));
        columns.add(Column::bool(
            "enable_flap_detection",
            "Whether flap detection is activated in general (0/1)",
            p(),
            |s: &ProgramStatus| s.enable_flap_detection,
        ));
        columns.add(Column::time(
            "last_command_check",
            "The time of the last check for a command",
            p(),
            |s: &ProgramStatus| s.last_command_check,
        ));
        columns.add(Column::int(
            "num_hosts",
            "The total number of hosts",
            ColumnOffsets::new(),
            |r: &StatusRow| r.num_hosts as i64,
        ));
        columns.add(Column::int(
            "num_services",
            "The total number of services",
            ColumnOffsets::new(),
            |r: &StatusRow| r.num_services as i64,
        ));

        Self { columns, core }
    }
}

impl Table for StatusTable {
    fn name(&self) -> &str {
        "status"
    }

    fn name_prefix(&self) -> &str {
        "status_"
    }

    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    fn for_each_row(&self, state: &CoreState, _hint: &ScanHint, visit: &mut Visitor<'_>) {
        let row = StatusRow {
            program: state.program.clone(),
            num_hosts: state.num_hosts(),
            num_services: state.num_services(),
            counters: self.core.counters(),
        };
        visit(Row::new(&row));
    }
}
