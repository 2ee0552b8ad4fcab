use serde::{Deserialize, Serialize};

use crate::schema::graph::NodeId;
use crate::types::value::Value;
use crate::types::{ColumnValues, Key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Insert,
    Update,
    InsertOrUpdate,
    Replace,
    Delete,
}

/// A write as a client states it: a table, named columns and rows of
/// values. Deletes list the key columns and one key per row.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOp {
    pub kind: MutationKind,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl MutationOp {
    pub fn new(
        kind: MutationKind,
        table: impl Into<String>,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn insert(table: impl Into<String>, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::new(MutationKind::Insert, table, columns, rows)
    }

    pub fn update(table: impl Into<String>, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::new(MutationKind::Update, table, columns, rows)
    }

    pub fn delete(table: impl Into<String>, key_columns: &[&str], keys: Vec<Vec<Value>>) -> Self {
        Self::new(MutationKind::Delete, table, key_columns, keys)
    }
}

/// Insert or update of one row, with resolved column ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOp {
    pub table: NodeId,
    pub key: Key,
    pub columns: Vec<NodeId>,
    pub values: Vec<Value>,
}

impl RowOp {
    pub fn value_of(&self, column: NodeId) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .map(|i| &self.values[i])
    }

    pub fn cells(&self) -> impl Iterator<Item = (NodeId, &Value)> + '_ {
        self.columns.iter().copied().zip(self.values.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOp {
    pub table: NodeId,
    pub key: Key,
}

/// A single-row write against a physical table.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert(RowOp),
    Update(RowOp),
    Delete(DeleteOp),
}

impl WriteOp {
    pub fn table(&self) -> NodeId {
        match self {
            WriteOp::Insert(op) | WriteOp::Update(op) => op.table,
            WriteOp::Delete(op) => op.table,
        }
    }

    pub fn key(&self) -> &Key {
        match self {
            WriteOp::Insert(op) | WriteOp::Update(op) => &op.key,
            WriteOp::Delete(op) => &op.key,
        }
    }

    /// Column values written by an insert or update.
    pub fn row(&self) -> Option<&RowOp> {
        match self {
            WriteOp::Insert(op) | WriteOp::Update(op) => Some(op),
            WriteOp::Delete(_) => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteOp::Delete(_))
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            WriteOp::Insert(_) => "insert",
            WriteOp::Update(_) => "update",
            WriteOp::Delete(_) => "delete",
        }
    }

    /// Applies the write to the current contents of its row.
    pub fn apply_to(&self, current: Option<ColumnValues>) -> Option<ColumnValues> {
        match self {
            WriteOp::Insert(op) => Some(
                op.cells()
                    .map(|(column, value)| (column, value.clone()))
                    .collect(),
            ),
            WriteOp::Update(op) => {
                let mut row = current.unwrap_or_default();
                for (column, value) in op.cells() {
                    row.insert(column, value.clone());
                }
                Some(row)
            }
            WriteOp::Delete(_) => None,
        }
    }
}
