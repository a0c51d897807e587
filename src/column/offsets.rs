//! Rows and accessor chains
//!
//! A [`Row`] is an untyped borrow of one backing struct. A
//! [`ColumnOffsets`] chain walks from that struct to the struct a column
//! reads from (service -> host, status row -> counters). Every hop is a
//! typed function bound when the table registers its columns, so generic
//! code reads any table without knowing its row type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handle to one backing instance for the duration of one scan
#[derive(Clone, Copy, Default)]
pub struct Row<'a> {
    base: Option<&'a dyn Any>,
}

impl<'a> Row<'a> {
    pub fn new<T: Any>(base: &'a T) -> Self {
        Self { base: Some(base) }
    }

    /// Sentinel row. Every column resolves to its zero value.
    pub fn null() -> Self {
        Self { base: None }
    }

    pub fn is_null(&self) -> bool {
        self.base.is_none()
    }

    /// Typed view, `None` for the sentinel or a foreign row type
    pub fn raw<T: Any>(&self) -> Option<&'a T> {
        self.base.and_then(|base| base.downcast_ref::<T>())
    }

    fn base(&self) -> Option<&'a dyn Any> {
        self.base
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            Some(base) => write!(f, "Row({:?})", base.type_id()),
            None => f.write_str("Row(null)"),
        }
    }
}

type Hop = Arc<dyn for<'r> Fn(&'r dyn Any) -> Option<&'r dyn Any> + Send + Sync>;

fn hop<F>(f: F) -> F
where
    F: for<'r> Fn(&'r dyn Any) -> Option<&'r dyn Any> + Send + Sync + 'static,
{
    f
}

/// Chain of typed hops from a row to the struct a column reads
#[derive(Clone, Default)]
pub struct ColumnOffsets {
    hops: Vec<Hop>,
}

impl ColumnOffsets {
    /// Empty chain: columns read the row itself
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new chain extended by one hop from `S` to `T`
    pub fn add<S: Any, T: Any>(&self, step: fn(&S) -> Option<&T>) -> Self {
        let mut hops = self.hops.clone();
        hops.push(Arc::new(hop(move |base| {
            base.downcast_ref::<S>()
                .and_then(step)
                .map(|target| target as &dyn Any)
        })));
        Self { hops }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Walks the chain. `None` when the row is the sentinel or a hop has no
    /// target (missing optional field).
    pub fn shift<'a>(&self, row: Row<'a>) -> Option<&'a dyn Any> {
        let mut current = row.base()?;
        for hop in &self.hops {
            current = hop(current)?;
        }
        Some(current)
    }
}

impl fmt::Debug for ColumnOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnOffsets({} hops)", self.hops.len())
    }
}
