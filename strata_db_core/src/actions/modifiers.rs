use crate::error::{Error, Result};
use crate::schema::catalog::{Index, Table};
use crate::schema::graph::NodeId;
use crate::types::value::Value;
use crate::types::{ColumnValues, Key};

use super::context::ActionContext;
use super::ops::{RowOp, WriteOp};
use super::Modifier;

/// Projects a row of an indexed table into its index data table.
///
/// Returns `None` when the index is null filtered and one of the filtered
/// columns is NULL in `row`.
pub fn index_entry(ctx: &ActionContext<'_>, index: NodeId, row: &ColumnValues) -> Result<Option<RowOp>> {
    let schema = ctx.schema();
    let index = schema
        .get::<Index>(index)
        .ok_or_else(|| Error::Internal(format!("index {index} is not part of the schema")))?;
    let table = schema.get::<Table>(index.table).ok_or_else(|| {
        Error::Internal(format!("index {} has no indexed table", index.name))
    })?;
    let data_table = schema.get::<Table>(index.data_table).ok_or_else(|| {
        Error::Internal(format!("index {} has no data table", index.name))
    })?;

    let cell = |column: &NodeId| row.get(column).cloned().unwrap_or(Value::Null);
    if index.null_filtered_columns.iter().any(|c| cell(c).is_null()) {
        return Ok(None);
    }
    let key = Key::new(index.expected_data_key(table).iter().map(|k| cell(&k.column)).collect());

    let mut entry = RowOp {
        table: data_table.id,
        key,
        columns: Vec::new(),
        values: Vec::new(),
    };
    for column in schema.table_columns(data_table) {
        if let Some(source) = column.source_column {
            entry.columns.push(column.id);
            entry.values.push(cell(&source));
        }
    }
    Ok(Some(entry))
}

/// Writes the index entry of the final row of every insert and update.
pub struct IndexModifier {
    index: NodeId,
    table: NodeId,
    index_name: String,
}

impl IndexModifier {
    pub fn new(index: &Index) -> Self {
        Self {
            index: index.id,
            table: index.table,
            index_name: index.name.clone(),
        }
    }
}

impl Modifier for IndexModifier {
    fn modify(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        if op.is_delete() || op.table() != self.table {
            return Ok(());
        }
        let Some(row) = ctx.read(self.table, op.key())? else {
            return Ok(());
        };
        if let Some(entry) = index_entry(ctx, self.index, &row)? {
            ctx.emit(WriteOp::Insert(entry));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("IndexModifier({})", self.index_name)
    }
}
