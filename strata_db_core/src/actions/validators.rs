use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::catalog::{OnDeleteAction, Table};
use crate::schema::graph::NodeId;
use crate::types::Key;
use crate::types::value::Value;

use super::context::ActionContext;
use super::ops::WriteOp;
use super::Validator;

fn table<'a>(ctx: &ActionContext<'a>, id: NodeId) -> Result<&'a Table> {
    ctx.table(id)
        .ok_or_else(|| Error::Internal(format!("table {id} is not part of the schema")))
}

/// Checks every written cell against its column: type, length, NULL-ness,
/// generated columns and placement keys.
pub struct ColumnValueValidator {
    table: NodeId,
    table_name: String,
    placements: BTreeSet<String>,
}

impl ColumnValueValidator {
    pub fn new(table: &Table, placements: BTreeSet<String>) -> Self {
        Self {
            table: table.id,
            table_name: table.name.clone(),
            placements,
        }
    }
}

impl Validator for ColumnValueValidator {
    fn validate(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let Some(row) = op.row() else {
            return Ok(());
        };
        let table = table(ctx, self.table)?;
        for (column_id, value) in row.cells() {
            let column = ctx.column(column_id).ok_or_else(|| {
                Error::Internal(format!("column {column_id} is not part of {}", table.name))
            })?;
            let keyed_update = matches!(op, WriteOp::Update(_)) && table.is_key_column(column_id);
            if column.is_generated() && !ctx.is_internal() && !keyed_update {
                return Err(Error::InvalidArgument(format!(
                    "Cannot write into generated column {}.{}.",
                    table.name, column.name
                )));
            }
            if !value.matches_type(&column.data_type) {
                return Err(Error::TypeMismatch(format!(
                    "Column {}.{} expects {}.",
                    table.name,
                    column.name,
                    column.sql_type()
                )));
            }
            if value.is_null() && !column.nullable {
                return Err(Error::violation(
                    &column.name,
                    &table.name,
                    format!(
                        "Cannot specify a null value for column: {}.{} in table: {} referenced by key: {}",
                        table.name, column.name, table.name, row.key
                    ),
                ));
            }
            if let (Some(limit), Some(length)) = (column.max_length, value.declared_length()) {
                if length as i64 > limit {
                    return Err(Error::violation(
                        &column.name,
                        &table.name,
                        format!(
                            "New value exceeds the maximum size limit for this column: {}.{}, size: {length}, limit: {limit}.",
                            table.name, column.name
                        ),
                    ));
                }
            }
            if column.placement_key {
                if let Value::String(placement) = value {
                    if !self.placements.contains(placement) {
                        return Err(Error::InvalidArgument(format!(
                            "Invalid placement {placement} for column {}.{}.",
                            table.name, column.name
                        )));
                    }
                }
            }
        }

        if let WriteOp::Insert(insert) = op {
            for column in ctx.schema().table_columns(table) {
                let has_source = column.has_default_value()
                    || column.is_generated()
                    || ctx.is_pending(column.id);
                if !column.nullable && !has_source && insert.value_of(column.id).is_none() {
                    return Err(Error::violation(
                        &column.name,
                        &table.name,
                        format!(
                            "A new row in table {} does not specify a non-null value for NOT NULL column: {}",
                            table.name, column.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ColumnValueValidator({})", self.table_name)
    }
}

/// Inserts need a free key, updates an existing row.
pub struct RowExistenceValidator {
    table: NodeId,
    table_name: String,
}

impl RowExistenceValidator {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.id,
            table_name: table.name.clone(),
        }
    }
}

impl Validator for RowExistenceValidator {
    fn validate(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        match op {
            // A generated key is checked when the row is staged.
            WriteOp::Insert(_) if ctx.has_pending_key() => Ok(()),
            WriteOp::Insert(insert) => match ctx.read(self.table, &insert.key)? {
                Some(_) => Err(Error::AlreadyExists(format!(
                    "Row {} in table {} already exists",
                    insert.key, self.table_name
                ))),
                None => Ok(()),
            },
            WriteOp::Update(update) => match ctx.read(self.table, &update.key)? {
                Some(_) => Ok(()),
                None => Err(Error::NotFound(format!(
                    "Row {} in table {} is missing. Row cannot be updated.",
                    update.key, self.table_name
                ))),
            },
            WriteOp::Delete(_) => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!("RowExistenceValidator({})", self.table_name)
    }
}

/// Parent side of an interleave: with `ON DELETE NO ACTION`, a parent row
/// cannot be deleted while child rows exist.
pub struct InterleaveParentValidator {
    parent_name: String,
    child: NodeId,
    child_name: String,
}

impl InterleaveParentValidator {
    pub fn new(parent: &Table, child: &Table) -> Self {
        Self {
            parent_name: parent.name.clone(),
            child: child.id,
            child_name: child.name.clone(),
        }
    }
}

impl Validator for InterleaveParentValidator {
    fn validate(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let WriteOp::Delete(delete) = op else {
            return Ok(());
        };
        if table(ctx, self.child)?.on_delete != OnDeleteAction::NoAction {
            return Ok(());
        }
        if ctx.scan(self.child, delete.key.values())?.is_empty() {
            return Ok(());
        }
        Err(Error::violation(
            &self.child_name,
            &self.parent_name,
            format!(
                "Cannot delete row {} of table {} while child rows exist in interleaved table {}.",
                delete.key, self.parent_name, self.child_name
            ),
        ))
    }

    fn describe(&self) -> String {
        format!(
            "InterleaveParentValidator({} -> {})",
            self.parent_name, self.child_name
        )
    }
}

/// Child side of an interleave: the parent row must exist.
pub struct InterleaveChildValidator {
    parent: NodeId,
    parent_name: String,
    child: NodeId,
    child_name: String,
}

impl InterleaveChildValidator {
    pub fn new(parent: &Table, child: &Table) -> Self {
        Self {
            parent: parent.id,
            parent_name: parent.name.clone(),
            child: child.id,
            child_name: child.name.clone(),
        }
    }
}

impl Validator for InterleaveChildValidator {
    fn validate(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let WriteOp::Insert(insert) = op else {
            return Ok(());
        };
        let parent_len = table(ctx, self.parent)?.primary_key.len();
        let child = table(ctx, self.child)?;
        if child.primary_key[..parent_len.min(child.primary_key.len())]
            .iter()
            .any(|k| ctx.is_pending(k.column))
        {
            return Ok(());
        }
        let parent_key = Key::new(insert.key.prefix(parent_len).to_vec());
        if ctx.read(self.parent, &parent_key)?.is_some() {
            return Ok(());
        }
        Err(Error::violation(
            &self.child_name,
            &self.child_name,
            format!(
                "Insert failed because key was not found in parent table {}: {}",
                self.parent_name, parent_key
            ),
        ))
    }

    fn describe(&self) -> String {
        format!(
            "InterleaveChildValidator({} -> {})",
            self.parent_name, self.child_name
        )
    }
}
