//! `hosts` table

use std::sync::Arc;

use crate::auth::User;
use crate::column::{Column, ColumnOffsets, ColumnSet, Row};
use crate::core::{Core, CoreState, Host};

use super::{ScanHint, Table, Visitor};

/// One row per host
pub struct HostsTable {
    columns: ColumnSet,
    core: Arc<dyn Core>,
}

impl HostsTable {
    pub fn new(core: Arc<dyn Core>) -> Self {
        let mut columns = ColumnSet::new();
        Self::register_columns(&mut columns, "", &ColumnOffsets::new());
        Self { columns, core }
    }

    /// Registers the host column family. `offsets` must lead to a [`Host`];
    /// the services table reuses this with prefix `host_`.
    pub fn register_columns(columns: &mut ColumnSet, prefix: &str, offsets: &ColumnOffsets) {
        let name = |n: &str| format!("{}{}", prefix, n);
        let o = || offsets.clone();

        columns.add(Column::string(name("name"), "Host name", o(), |h: &Host| h.name.clone()));
        columns.add(Column::string(name("alias"), "An alias name for the host", o(), |h: &Host| {
            h.alias.clone()
        }));
        columns.add(Column::string(name("address"), "IP address", o(), |h: &Host| {
            h.address.clone()
        }));
        columns.add(Column::int(
            name("state"),
            "The current state of the host (0: up, 1: down, 2: unreachable)",
            o(),
            |h: &Host| i64::from(h.state),
        ));
        columns.add(Column::bool(
            name("has_been_checked"),
            "Whether the host has already been checked (0/1)",
            o(),
            |h: &Host| h.has_been_checked,
        ));
        columns.add(Column::time(name("last_check"), "Time of the last check", o(), |h: &Host| {
            h.last_check
        }));
        columns.add(Column::double(
            name("latency"),
            "Time difference between scheduled check time and actual check time",
            o(),
            |h: &Host| h.latency,
        ));
        columns.add(Column::double(
            name("execution_time"),
            "Time the host check needed for execution",
            o(),
            |h: &Host| h.execution_time,
        ));
        columns.add(Column::string(
            name("plugin_output"),
            "Output of the last host check",
            o(),
            |h: &Host| h.plugin_output.clone(),
        ));
        columns.add(Column::string(
            name("perf_data"),
            "Optional performance data of the last host check",
            o(),
            |h: &Host| h.perf_data.clone(),
        ));
        columns.add(Column::list(
            name("contacts"),
            "A list of all contacts of this host",
            o(),
            |h: &Host| h.contacts.clone(),
        ));
        columns.add(Column::list(
            name("groups"),
            "A list of all host groups this host is in",
            o(),
            |h: &Host| h.groups.clone(),
        ));
        columns.add(Column::bool(
            name("acknowledged"),
            "Whether the current host problem has been acknowledged (0/1)",
            o(),
            |h: &Host| h.acknowledged,
        ));
        columns.add(Column::blob(
            name("mk_inventory"),
            "The raw inventory data of the host",
            o(),
            |h: &Host| h.mk_inventory.clone(),
        ));
    }
}

impl Table for HostsTable {
    fn name(&self) -> &str {
        "hosts"
    }

    fn name_prefix(&self) -> &str {
        "host_"
    }

    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    fn indexed_columns(&self) -> &[&'static str] {
        &["name"]
    }

    fn for_each_row(&self, state: &CoreState, hint: &ScanHint, visit: &mut Visitor<'_>) {
        if let Some(name) = hint.restriction("name") {
            if let Some(host) = state.host(name) {
                visit(Row::new(host));
            }
            return;
        }
        for host in state.hosts() {
            if !visit(Row::new(host)) {
                break;
            }
        }
    }

    fn is_authorized(&self, user: &dyn User, row: Row<'_>) -> bool {
        row.raw::<Host>()
            .map_or(false, |host| user.is_authorized_for_host(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ContactUser, NoAuthUser};
    use crate::column::{ColumnType, Value};
    use crate::core::{MemoryCore, ProgramStatus};
    use crate::query::{Query, QueryLimits, Request};

    fn core() -> Arc<MemoryCore> {
        let mut state = CoreState::new(ProgramStatus::default());
        let hosts = [("web", 0, "alice"), ("db", 2, "bob"), ("mail", 1, "alice")];
        for (name, host_state, contact) in hosts {
            let mut host = Host::new(name);
            host.state = host_state;
            host.contacts = vec![contact.to_string()];
            state.add_host(host);
        }
        Arc::new(MemoryCore::new(state))
    }

    fn run(table: &HostsTable, text: &str, user: &dyn User) -> (String, Query) {
        let request = Request::parse(text).unwrap();
        let mut query = Query::new(&request, table, QueryLimits::default()).unwrap();
        table.answer_query(&mut query, user).unwrap();
        (String::from_utf8(query.take_output()).unwrap(), query)
    }

    #[test]
    fn test_columns_registered() {
        let table = HostsTable::new(core());
        assert_eq!(table.column("state").unwrap().column_type(), ColumnType::Int);
        assert_eq!(table.column("mk_inventory").unwrap().column_type(), ColumnType::Blob);
        assert!(table.column("host_name").is_some());
        assert!(table.column("service_name").is_none());
    }

    #[test]
    fn test_projection_with_filter() {
        let table = HostsTable::new(core());
        let (out, _) =
            run(&table, "GET hosts\nColumns: name state\nFilter: state != 0\n", &NoAuthUser);
        assert_eq!(out, "db;2\nmail;1\n");
    }

    #[test]
    fn test_name_equality_narrows_scan() {
        let table = HostsTable::new(core());
        let (out, query) =
            run(&table, "GET hosts\nColumns: name\nFilter: host_name = mail\n", &NoAuthUser);
        assert_eq!(out, "mail\n");
        assert_eq!(query.rows_scanned(), 1);
    }

    #[test]
    fn test_contact_sees_own_hosts_only() {
        let table = HostsTable::new(core());
        let alice = ContactUser::new("alice");
        let (out, query) = run(&table, "GET hosts\nColumns: name\n", &alice);
        assert_eq!(out, "web\nmail\n");
        assert_eq!(query.rows_scanned(), 2);

        // Hidden rows do not show up in stats either
        let (out, _) = run(&table, "GET hosts\nStats: state = 2\n", &alice);
        assert_eq!(out, "0\n");
    }

    #[test]
    fn test_default_row_resolves_zero_values() {
        let table = HostsTable::new(core());
        let row = table.get_default();
        for column in table.columns().iter() {
            assert_eq!(column.value(row), Value::zero(column.column_type()));
        }
    }
}
