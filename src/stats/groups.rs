//! Group-keyed accumulation in first-seen order

use std::collections::HashMap;

use crate::column::Value;

use super::aggregation::{Accumulator, StatsSpec};

/// Hashable form of a group key value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Int(i64),
    /// Bit pattern; -0.0 and 0.0 are distinct groups
    Double(u64),
    String(String),
    Time(i64),
    List(Vec<String>),
    Blob(Vec<u8>),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Int(i) => KeyPart::Int(*i),
            Value::Double(d) => KeyPart::Double(d.to_bits()),
            Value::String(s) => KeyPart::String(s.clone()),
            Value::Time(t) => KeyPart::Time(t.timestamp()),
            Value::List(l) => KeyPart::List(l.clone()),
            Value::Blob(b) => KeyPart::Blob(b.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Group {
    key: Vec<Value>,
    accumulators: Vec<Accumulator>,
}

/// Accumulators per distinct group key.
///
/// Groups are kept in the order their key was first seen.
#[derive(Debug, Clone, Default)]
pub struct StatsGroups {
    groups: Vec<Group>,
    index: HashMap<Vec<KeyPart>, usize>,
}

impl StatsGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Accumulators of the group for `key`, created on first sight
    pub fn group_mut(&mut self, key: Vec<Value>, specs: &[StatsSpec]) -> &mut [Accumulator] {
        let hashed: Vec<KeyPart> = key.iter().map(KeyPart::from).collect();
        let idx = match self.index.get(&hashed) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.groups.push(Group {
                    key,
                    accumulators: specs.iter().map(StatsSpec::accumulator).collect(),
                });
                self.index.insert(hashed, idx);
                idx
            }
        };
        &mut self.groups[idx].accumulators
    }

    /// Folds partial groups built with the same specs. Groups new to `self`
    /// are appended in their order in `other`.
    pub fn merge(&mut self, other: StatsGroups, specs: &[StatsSpec]) {
        for group in other.groups {
            let accumulators = self.group_mut(group.key, specs);
            for (acc, partial) in accumulators.iter_mut().zip(&group.accumulators) {
                acc.merge(partial);
            }
        }
    }

    /// Output rows: key values followed by one result per spec
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.groups
            .into_iter()
            .map(|group| {
                let mut row = group.key;
                row.extend(group.accumulators.iter().map(Accumulator::result));
                row
            })
            .collect()
    }
}
