//! Table name routing

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::Core;
use crate::query::{QueryError, QueryResult};

use super::columns::{ColumnInfo, ColumnsTable};
use super::hosts::HostsTable;
use super::services::ServicesTable;
use super::status::StatusTable;
use super::Table;

/// Maps table names to tables. Built once, read-only afterwards.
pub struct TableRegistry {
    tables: BTreeMap<String, Arc<dyn Table>>,
}

impl TableRegistry {
    /// Registry with every built-in table over `core`
    pub fn new(core: Arc<dyn Core>) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(StatusTable::new(core.clone())));
        registry.register(Arc::new(HostsTable::new(core.clone())));
        registry.register(Arc::new(ServicesTable::new(core.clone())));

        let infos = registry
            .tables
            .values()
            .flat_map(|table| ColumnInfo::of_table(table.as_ref()))
            .collect();
        registry.register(Arc::new(ColumnsTable::new(core, infos)));
        registry
    }

    pub fn empty() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Adds a table, replacing one of the same name
    pub fn register(&mut self, table: Arc<dyn Table>) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn get(&self, name: &str) -> QueryResult<Arc<dyn Table>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CoreState, MemoryCore, ProgramStatus};

    fn registry() -> TableRegistry {
        TableRegistry::new(Arc::new(MemoryCore::new(CoreState::new(ProgramStatus::default()))))
    }

    #[test]
    fn test_builtin_tables() {
        let registry = registry();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["columns", "hosts", "services", "status"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_unknown_table() {
        let err = registry().get("comments").err().unwrap();
        assert_eq!(err, QueryError::UnknownTable("comments".into()));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_columns_table_covers_all_tables() {
        let registry = registry();
        let columns = registry.get("columns").unwrap();
        let hosts = registry.get("hosts").unwrap();
        assert!(columns.column("table").is_some());
        assert!(hosts.column("name").is_some());
    }
}
