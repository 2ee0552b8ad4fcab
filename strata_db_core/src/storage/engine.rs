use crate::error::Result;
use crate::schema::graph::NodeId;
use crate::types::value::Value;
use crate::types::{ColumnValues, Key};

/// Storage engine trait - abstraction over the physical key/row store.
///
/// Tables are addressed by their schema node id, rows by primary key. A row
/// is the full set of stored cells for that key.
pub trait StorageEngine: Send + Sync {
    /// Reads the row stored under `key`, if any.
    fn read(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>>;

    /// Returns every row whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, table: NodeId, prefix: &[Value]) -> Result<Vec<(Key, ColumnValues)>>;

    /// Inserts or overwrites the row stored under `key`.
    fn put(&mut self, table: NodeId, key: Key, row: ColumnValues) -> Result<()>;

    /// Removes the row stored under `key`; missing rows are ignored.
    fn delete(&mut self, table: NodeId, key: &Key) -> Result<()>;

    /// Removes every row of `table`.
    fn drop_table(&mut self, table: NodeId) -> Result<()>;

    /// Scans all rows from the specified table.
    fn scan(&self, table: NodeId) -> Result<Vec<(Key, ColumnValues)>> {
        self.scan_prefix(table, &[])
    }
}
