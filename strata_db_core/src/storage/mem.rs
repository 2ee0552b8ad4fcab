use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::schema::graph::NodeId;
use crate::storage::engine::StorageEngine;
use crate::types::value::Value;
use crate::types::{ColumnValues, Key};

/// In-memory storage implementation using ordered maps per table
#[derive(Debug, Default)]
pub struct MemStorage {
    tables: HashMap<NodeId, BTreeMap<Key, ColumnValues>>,
}

impl MemStorage {
    /// Creates a new empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored for `table`.
    pub fn row_count(&self, table: NodeId) -> usize {
        self.tables.get(&table).map(|rows| rows.len()).unwrap_or(0)
    }
}

impl StorageEngine for MemStorage {
    fn read(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>> {
        Ok(self
            .tables
            .get(&table)
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    fn scan_prefix(&self, table: NodeId, prefix: &[Value]) -> Result<Vec<(Key, ColumnValues)>> {
        let Some(rows) = self.tables.get(&table) else {
            return Ok(Vec::new());
        };
        let start = Key::new(prefix.to_vec());
        Ok(rows
            .range(start..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, row)| (key.clone(), row.clone()))
            .collect())
    }

    fn put(&mut self, table: NodeId, key: Key, row: ColumnValues) -> Result<()> {
        self.tables.entry(table).or_default().insert(key, row);
        Ok(())
    }

    fn delete(&mut self, table: NodeId, key: &Key) -> Result<()> {
        if let Some(rows) = self.tables.get_mut(&table) {
            rows.remove(key);
        }
        Ok(())
    }

    fn drop_table(&mut self, table: NodeId) -> Result<()> {
        self.tables.remove(&table);
        Ok(())
    }
}
