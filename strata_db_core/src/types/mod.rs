pub mod datatype;
pub mod value;

use std::collections::BTreeMap;

use crate::schema::graph::NodeId;
use value::Value;

/// Stored cells of one row, keyed by column id.
pub type ColumnValues = BTreeMap<NodeId, Value>;

/// Primary key of a stored row: key column values in key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Key(pub Vec<Value>);

impl Key {
    pub fn new(values: Vec<Value>) -> Self {
        Key(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &[Value]) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn prefix(&self, len: usize) -> &[Value] {
        &self.0[..len.min(self.0.len())]
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(value::value_to_string).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
