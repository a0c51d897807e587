//! `services` table

use std::sync::Arc;

use crate::auth::User;
use crate::column::{Column, ColumnOffsets, ColumnSet, Row};
use crate::core::{Core, CoreState, Host, Service};

use super::hosts::HostsTable;
use super::{ScanHint, Table, Visitor};

fn service_host(service: &Service) -> Option<&Host> {
    Some(service.host.as_ref())
}

/// One row per service, with the columns of its host as `host_*`
pub struct ServicesTable {
    columns: ColumnSet,
    core: Arc<dyn Core>,
}

impl ServicesTable {
    pub fn new(core: Arc<dyn Core>) -> Self {
        let mut columns = ColumnSet::new();
        let o = ColumnOffsets::new;

        columns.add(Column::string("description", "Service description", o(), |s: &Service| {
            s.description.clone()
        }));
        columns.add(Column::int(
            "state",
            "The current state of the service (0: OK, 1: WARN, 2: CRITICAL, 3: UNKNOWN)",
            o(),
            |s: &Service| i64::from(s.state),
        ));
        columns.add(Column::bool(
            "has_been_checked",
            "Whether the service already has been checked (0/1)",
            o(),
            |s: &Service| s.has_been_checked,
        ));
        columns.add(Column::time("last_check", "The time of the last check", o(), |s: &Service| {
            s.last_check
        }));
        columns.add(Column::double(
            "latency",
            "Time difference between scheduled check time and actual check time",
            o(),
            |s: &Service| s.latency,
        ));
        columns.add(Column::double(
            "execution_time",
            "Time the service check needed for execution",
            o(),
            |s: &Service| s.execution_time,
        ));
        columns.add(Column::double(
            "check_interval",
            "Number of basic interval lengths between two scheduled checks",
            o(),
            |s: &Service| s.check_interval,
        ));
        columns.add(Column::string("plugin_output", "Output of the last check", o(), |s: &Service| {
            s.plugin_output.clone()
        }));
        columns.add(Column::string(
            "perf_data",
            "Performance data of the last check",
            o(),
            |s: &Service| s.perf_data.clone(),
        ));
        columns.add(Column::list(
            "contacts",
            "A list of all contacts of the service, either direct or via a contact group",
            o(),
            |s: &Service| s.contacts.clone(),
        ));
        columns.add(Column::list(
            "groups",
            "A list of all service groups the service is in",
            o(),
            |s: &Service| s.groups.clone(),
        ));
        columns.add(Column::bool(
            "acknowledged",
            "Whether the current service problem has been acknowledged (0/1)",
            o(),
            |s: &Service| s.acknowledged,
        ));

        let host_offsets = ColumnOffsets::new().add(service_host);
        HostsTable::register_columns(&mut columns, "host_", &host_offsets);
        Self { columns, core }
    }
}

impl Table for ServicesTable {
    fn name(&self) -> &str {
        "services"
    }

    fn name_prefix(&self) -> &str {
        "service_"
    }

    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    fn indexed_columns(&self) -> &[&'static str] {
        &["host_name"]
    }

    fn for_each_row(&self, state: &CoreState, hint: &ScanHint, visit: &mut Visitor<'_>) {
        match hint.restriction("host_name") {
            Some(host_name) => {
                for service in state.services_of(host_name) {
                    if !visit(Row::new(service)) {
                        break;
                    }
                }
            }
            None => {
                for service in state.services() {
                    if !visit(Row::new(service)) {
                        break;
                    }
                }
            }
        }
    }

    fn is_authorized(&self, user: &dyn User, row: Row<'_>) -> bool {
        row.raw::<Service>()
            .map_or(false, |service| user.is_authorized_for_service(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ContactUser, NoAuthUser, ServiceAuthorization};
    use crate::core::{MemoryCore, ProgramStatus};
    use crate::query::{Query, QueryLimits, Request};

    fn core() -> Arc<MemoryCore> {
        let mut state = CoreState::new(ProgramStatus::default());
        let mut web = Host::new("web");
        web.contacts = vec!["alice".into()];
        state.add_host(web);
        state.add_host(Host::new("db"));

        if let Some(s) = state.add_service("web", "HTTP") {
            s.state = 2;
        }
        state.add_service("web", "CPU");
        if let Some(s) = state.add_service("db", "Postgres") {
            s.state = 2;
            s.contacts = vec!["bob".into()];
        }
        Arc::new(MemoryCore::new(state))
    }

    fn run(table: &ServicesTable, text: &str, user: &dyn User) -> (String, usize) {
        let request = Request::parse(text).unwrap();
        let mut query = Query::new(&request, table, QueryLimits::default()).unwrap();
        table.answer_query(&mut query, user).unwrap();
        (String::from_utf8(query.take_output()).unwrap(), query.rows_scanned())
    }

    #[test]
    fn test_host_columns_through_hop() {
        let table = ServicesTable::new(core());
        let (out, _) =
            run(&table, "GET services\nColumns: host_name description state\n", &NoAuthUser);
        assert_eq!(out, "web;HTTP;2\nweb;CPU;0\ndb;Postgres;2\n");
    }

    #[test]
    fn test_prefixed_service_columns() {
        let table = ServicesTable::new(core());
        assert!(table.column("service_description").is_some());
        assert!(table.column("host_contacts").is_some());
        assert!(table.column("host_description").is_none());
    }

    #[test]
    fn test_host_name_narrows_scan() {
        let table = ServicesTable::new(core());
        let (out, scanned) = run(
            &table,
            "GET services\nColumns: description\nFilter: host_name = db\n",
            &NoAuthUser,
        );
        assert_eq!(out, "Postgres\n");
        assert_eq!(scanned, 1);
    }

    #[test]
    fn test_loose_and_strict_authorization() {
        let table = ServicesTable::new(core());
        let text = "GET services\nColumns: description\n";

        let (out, _) = run(&table, text, &ContactUser::new("alice"));
        assert_eq!(out, "HTTP\nCPU\n");

        let strict =
            ContactUser::new("alice").with_service_authorization(ServiceAuthorization::Strict);
        let (out, _) = run(&table, text, &strict);
        assert_eq!(out, "");

        let (out, _) = run(&table, text, &ContactUser::new("bob"));
        assert_eq!(out, "Postgres\n");
    }

    #[test]
    fn test_stats_grouped_by_host() {
        let table = ServicesTable::new(core());
        let (out, _) = run(
            &table,
            "GET services\nColumns: host_name\nStats: state = 2\nStats: state = 0\n",
            &NoAuthUser,
        );
        assert_eq!(out, "web;1;1\ndb;1;0\n");
    }
}
