//! `columns` table: metadata of every registered column

use std::sync::Arc;

use crate::column::{Column, ColumnOffsets, ColumnSet, ColumnType, Row};
use crate::core::{Core, CoreState};

use super::{ScanHint, Table, Visitor};

/// Description of one column of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub table: String,
    pub name: String,
    pub description: String,
    pub column_type: ColumnType,
}

impl ColumnInfo {
    /// Metadata rows of every column of `table`, in registration order
    pub fn of_table(table: &dyn Table) -> Vec<ColumnInfo> {
        table
            .columns()
            .iter()
            .map(|column| ColumnInfo {
                table: table.name().to_string(),
                name: column.name().to_string(),
                description: column.description().to_string(),
                column_type: column.column_type(),
            })
            .collect()
    }
}

/// Rows are fixed at construction; the core lock is still taken per query
pub struct ColumnsTable {
    columns: ColumnSet,
    rows: Vec<ColumnInfo>,
    core: Arc<dyn Core>,
}

impl ColumnsTable {
    /// `rows` describe the other tables; this table's own columns are appended
    pub fn new(core: Arc<dyn Core>, rows: Vec<ColumnInfo>) -> Self {
        let mut columns = ColumnSet::new();
        let o = ColumnOffsets::new;
        columns.add(Column::string("table", "The name of the table", o(), |c: &ColumnInfo| {
            c.table.clone()
        }));
        columns.add(Column::string(
            "name",
            "The name of the column within the table",
            o(),
            |c: &ColumnInfo| c.name.clone(),
        ));
        columns.add(Column::string(
            "description",
            "A description of the column",
            o(),
            |c: &ColumnInfo| c.description.clone(),
        ));
        columns.add(Column::string(
            "type",
            "The data type of the column (int, float, string, list, time, blob)",
            o(),
            |c: &ColumnInfo| c.column_type.type_name().to_string(),
        ));

        let mut table = Self {
            columns,
            rows,
            core,
        };
        let own = ColumnInfo::of_table(&table);
        table.rows.extend(own);
        table
    }
}

impl Table for ColumnsTable {
    fn name(&self) -> &str {
        "columns"
    }

    fn name_prefix(&self) -> &str {
        "column_"
    }

    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    fn for_each_row(&self, _state: &CoreState, _hint: &ScanHint, visit: &mut Visitor<'_>) {
        for info in &self.rows {
            if !visit(Row::new(info)) {
                break;
            }
        }
    }
}
