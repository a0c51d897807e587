//! Column descriptors and per-table column registries

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::offsets::{ColumnOffsets, Row};
use super::types::{ColumnType, Value};

type Getter<T> = Arc<dyn Fn(&dyn Any) -> Option<T> + Send + Sync>;

fn getter<R, T, F>(get: F) -> Getter<T>
where
    R: Any,
    T: 'static,
    F: Fn(&R) -> T + Send + Sync + 'static,
{
    Arc::new(move |base: &dyn Any| base.downcast_ref::<R>().map(&get))
}

#[derive(Clone)]
enum Accessor {
    Int(Getter<i64>),
    Double(Getter<f64>),
    String(Getter<String>),
    Time(Getter<DateTime<Utc>>),
    List(Getter<Vec<String>>),
    Blob(Getter<Vec<u8>>),
}

impl Accessor {
    fn column_type(&self) -> ColumnType {
        match self {
            Accessor::Int(_) => ColumnType::Int,
            Accessor::Double(_) => ColumnType::Double,
            Accessor::String(_) => ColumnType::String,
            Accessor::Time(_) => ColumnType::Time,
            Accessor::List(_) => ColumnType::List,
            Accessor::Blob(_) => ColumnType::Blob,
        }
    }
}

/// One named, typed field of a table row
///
/// The accessor is bound at registration and only ever applied to rows of
/// the registering table. Resolution is pure and never fails: a sentinel
/// row, a foreign row, or a missing hop target yields the zero value of the
/// declared type.
#[derive(Clone)]
pub struct Column {
    name: String,
    description: String,
    offsets: ColumnOffsets,
    accessor: Accessor,
}

impl Column {
    fn with_accessor(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        accessor: Accessor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            offsets,
            accessor,
        }
    }

    pub fn int<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> i64 + Send + Sync + 'static,
    {
        Self::with_accessor(name, description, offsets, Accessor::Int(getter(get)))
    }

    /// Boolean fields are exposed as 0/1 integers
    pub fn bool<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self::int(name, description, offsets, move |r: &R| i64::from(get(r)))
    }

    pub fn double<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> f64 + Send + Sync + 'static,
    {
        Self::with_accessor(name, description, offsets, Accessor::Double(getter(get)))
    }

    pub fn string<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        Self::with_accessor(name, description, offsets, Accessor::String(getter(get)))
    }

    pub fn time<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self::with_accessor(name, description, offsets, Accessor::Time(getter(get)))
    }

    pub fn list<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        Self::with_accessor(name, description, offsets, Accessor::List(getter(get)))
    }

    pub fn blob<R, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        get: F,
    ) -> Self
    where
        R: Any,
        F: Fn(&R) -> Vec<u8> + Send + Sync + 'static,
    {
        Self::with_accessor(name, description, offsets, Accessor::Blob(getter(get)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn column_type(&self) -> ColumnType {
        self.accessor.column_type()
    }

    /// Resolves this column against a row
    pub fn value(&self, row: Row<'_>) -> Value {
        let base = self.offsets.shift(row);
        let resolved = base.and_then(|base| match &self.accessor {
            Accessor::Int(get) => get(base).map(Value::Int),
            Accessor::Double(get) => get(base).map(Value::Double),
            Accessor::String(get) => get(base).map(Value::String),
            Accessor::Time(get) => get(base).map(Value::Time),
            Accessor::List(get) => get(base).map(Value::List),
            Accessor::Blob(get) => get(base).map(Value::Blob),
        });
        resolved.unwrap_or_else(|| Value::zero(self.column_type()))
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("type", &self.column_type())
            .field("offsets", &self.offsets)
            .finish()
    }
}

/// Ordered column registry of one table
///
/// Insertion order is the default output layout. The first registration of
/// a name wins; later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Arc<Column>>,
    by_name: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a column, returns false if the name was already taken
    pub fn add(&mut self, column: Column) -> bool {
        if self.by_name.contains_key(column.name()) {
            return false;
        }
        self.by_name.insert(column.name().to_string(), self.columns.len());
        self.columns.push(Arc::new(column));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Column>> {
        self.by_name.get(name).map(|&idx| &self.columns[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Column>> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: String,
        state: i32,
        tags: Vec<String>,
        parent: Option<Box<Item>>,
    }

    fn item_parent(item: &Item) -> Option<&Item> {
        item.parent.as_deref()
    }

    fn sample() -> Item {
        Item {
            name: "child".into(),
            state: 2,
            tags: vec!["a".into()],
            parent: Some(Box::new(Item {
                name: "root".into(),
                state: 0,
                tags: vec![],
                parent: None,
            })),
        }
    }

    #[test]
    fn test_resolve_direct_columns() {
        let item = sample();
        let name = Column::string("name", "Name", ColumnOffsets::new(), |i: &Item| i.name.clone());
        let state =
            Column::int("state", "State", ColumnOffsets::new(), |i: &Item| i64::from(i.state));
        let tags = Column::list("tags", "Tags", ColumnOffsets::new(), |i: &Item| i.tags.clone());

        let row = Row::new(&item);
        assert_eq!(name.value(row), Value::String("child".into()));
        assert_eq!(state.value(row), Value::Int(2));
        assert_eq!(tags.value(row), Value::List(vec!["a".into()]));
    }

    #[test]
    fn test_resolve_through_hop() {
        let item = sample();
        let offsets = ColumnOffsets::new().add(item_parent);
        let parent_name =
            Column::string("parent_name", "Parent", offsets, |i: &Item| i.name.clone());
        assert_eq!(parent_name.value(Row::new(&item)), Value::String("root".into()));

        let orphan = Item {
            name: "x".into(),
            state: 0,
            tags: vec![],
            parent: None,
        };
        assert_eq!(parent_name.value(Row::new(&orphan)), Value::String(String::new()));
    }

    #[test]
    fn test_sentinel_yields_zero_of_declared_type() {
        let columns = [
            Column::int("i", "", ColumnOffsets::new(), |i: &Item| i64::from(i.state)),
            Column::double("d", "", ColumnOffsets::new(), |_: &Item| 1.5),
            Column::bool("b", "", ColumnOffsets::new(), |_: &Item| true),
            Column::time("t", "", ColumnOffsets::new(), |_: &Item| Utc::now()),
            Column::blob("x", "", ColumnOffsets::new(), |_: &Item| vec![1, 2]),
        ];
        for column in &columns {
            let value = column.value(Row::null());
            assert_eq!(value.column_type(), Some(column.column_type()));
            assert_eq!(value, Value::zero(column.column_type()));
        }
    }

    #[test]
    fn test_bool_column_is_int() {
        let item = sample();
        let column =
            Column::bool("has_parent", "", ColumnOffsets::new(), |i: &Item| i.parent.is_some());
        assert_eq!(column.column_type(), ColumnType::Int);
        assert_eq!(column.value(Row::new(&item)), Value::Int(1));
    }

    #[test]
    fn test_column_set_preserves_order_and_rejects_duplicates() {
        let name_column = |name: &str, description: &str| {
            Column::string(name, description, ColumnOffsets::new(), |i: &Item| i.name.clone())
        };
        let mut set = ColumnSet::new();
        assert!(set.add(name_column("b", "first")));
        assert!(set.add(name_column("a", "")));
        assert!(!set.add(name_column("b", "second")));

        let names: Vec<_> = set.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(set.get("b").unwrap().description(), "first");
        assert!(set.get("c").is_none());
        assert_eq!(set.len(), 2);
    }
}
