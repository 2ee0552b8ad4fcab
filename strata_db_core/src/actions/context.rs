use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::eval::Evaluator;
use crate::schema::Schema;
use crate::schema::catalog::{Column, Table};
use crate::schema::graph::NodeId;
use crate::storage::StorageEngine;
use crate::types::value::Value;
use crate::types::{ColumnValues, Key};

use super::ops::WriteOp;

/// Read access to rows as a transaction sees them.
pub trait RowReader {
    fn read_row(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>>;

    /// Rows whose key starts with `prefix`, in key order.
    fn scan_rows(&self, table: NodeId, prefix: &[Value]) -> Result<Vec<(Key, ColumnValues)>>;
}

/// Reads committed rows straight from a storage engine.
pub struct StorageReader<'a>(pub &'a dyn StorageEngine);

impl RowReader for StorageReader<'_> {
    fn read_row(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>> {
        self.0.read(table, key)
    }

    fn scan_rows(&self, table: NodeId, prefix: &[Value]) -> Result<Vec<(Key, ColumnValues)>> {
        self.0.scan_prefix(table, prefix)
    }
}

/// Everything an action may consult while it runs against one write.
///
/// Effectors and modifiers never write directly; they emit operations into
/// the context and the caller decides when to apply them.
pub struct ActionContext<'a> {
    schema: &'a Schema,
    evaluator: &'a Evaluator,
    store: &'a dyn RowReader,
    pre_image: Option<ColumnValues>,
    pending_key_columns: BTreeSet<NodeId>,
    internal: bool,
    effects: Vec<WriteOp>,
}

impl<'a> ActionContext<'a> {
    pub fn new(evaluator: &'a Evaluator, store: &'a dyn RowReader) -> Self {
        Self {
            schema: evaluator.schema().as_ref(),
            evaluator,
            store,
            pre_image: None,
            pending_key_columns: BTreeSet::new(),
            internal: false,
            effects: Vec::new(),
        }
    }

    /// The row as it was before the write being processed.
    pub fn with_pre_image(mut self, row: Option<ColumnValues>) -> Self {
        self.pre_image = row;
        self
    }

    /// Key columns whose values are generated after validation.
    pub fn with_pending_key_columns(mut self, columns: BTreeSet<NodeId>) -> Self {
        self.pending_key_columns = columns;
        self
    }

    /// Marks the write as produced by another action rather than a client.
    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn evaluator(&self) -> &'a Evaluator {
        self.evaluator
    }

    pub fn pre_image(&self) -> Option<&ColumnValues> {
        self.pre_image.as_ref()
    }

    pub fn is_pending(&self, column: NodeId) -> bool {
        self.pending_key_columns.contains(&column)
    }

    pub fn has_pending_key(&self) -> bool {
        !self.pending_key_columns.is_empty()
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn read(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>> {
        self.store.read_row(table, key)
    }

    pub fn scan(&self, table: NodeId, prefix: &[Value]) -> Result<Vec<(Key, ColumnValues)>> {
        self.store.scan_rows(table, prefix)
    }

    /// The row with the effects emitted so far applied on top.
    pub fn current_row(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>> {
        let mut row = self.read(table, key)?;
        for effect in self.effects.iter().filter(|e| e.table() == table && e.key() == key) {
            row = effect.apply_to(row);
        }
        Ok(row)
    }

    pub fn emit(&mut self, op: WriteOp) {
        self.effects.push(op);
    }

    pub fn take_effects(&mut self) -> Vec<WriteOp> {
        std::mem::take(&mut self.effects)
    }

    pub fn table(&self, id: NodeId) -> Option<&'a Table> {
        self.schema.get::<Table>(id)
    }

    pub fn column(&self, id: NodeId) -> Option<&'a Column> {
        self.schema.get::<Column>(id)
    }
}

/// Lower-cased column name to value, NULL for absent cells, as expected
/// by [`Evaluator::evaluate`].
pub fn row_by_name(columns: &[&Column], row: &ColumnValues) -> HashMap<String, Value> {
    columns
        .iter()
        .map(|c| {
            (
                c.name.to_lowercase(),
                row.get(&c.id).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

/// Builds the key of `row` under `key_columns`; absent cells are NULL.
pub fn key_of(key_columns: &[NodeId], row: &ColumnValues) -> Key {
    Key::new(
        key_columns
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
            .collect(),
    )
}
