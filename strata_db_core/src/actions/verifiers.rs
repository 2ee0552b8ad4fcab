use crate::error::{Error, Result};
use crate::schema::catalog::{CheckConstraint, ForeignKey, Index, Table};
use crate::schema::graph::NodeId;
use crate::types::Key;
use crate::types::value::{Value, value_to_string};

use super::context::{ActionContext, row_by_name};
use super::ops::WriteOp;
use super::Verifier;

fn lookup<'a, T>(found: Option<&'a T>, what: &str, id: NodeId) -> Result<&'a T> {
    found.ok_or_else(|| Error::Internal(format!("{what} {id} is not part of the schema")))
}

fn render(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(value_to_string).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Values of `wanted` taken from the parallel `columns`/`values` lists, or
/// `None` as soon as one of them is missing.
fn ordered(wanted: &[NodeId], columns: &[NodeId], values: &[Value]) -> Option<Vec<Value>> {
    wanted
        .iter()
        .map(|c| columns.iter().position(|x| x == c).map(|i| values[i].clone()))
        .collect()
}

/// Whether `table` holds a row whose `columns` equal `values`.
///
/// Uses the primary key when the columns cover a key prefix, then the
/// given index, and scans the table otherwise.
fn has_matching_row(
    ctx: &ActionContext<'_>,
    table: NodeId,
    index: Option<NodeId>,
    columns: &[NodeId],
    values: &[Value],
) -> Result<bool> {
    let table = lookup(ctx.table(table), "table", table)?;
    let key_ids = table.primary_key_ids();
    if columns.len() <= key_ids.len() {
        if let Some(prefix) = ordered(&key_ids[..columns.len()], columns, values) {
            if prefix.len() == key_ids.len() {
                return Ok(ctx.read(table.id, &Key::new(prefix))?.is_some());
            }
            return Ok(!ctx.scan(table.id, &prefix)?.is_empty());
        }
    }
    if let Some(index) = index.and_then(|id| ctx.schema().get::<Index>(id)) {
        let index_keys = index.key_column_ids();
        if columns.len() <= index_keys.len() {
            if let Some(prefix) = ordered(&index_keys[..columns.len()], columns, values) {
                return Ok(!ctx.scan(index.data_table, &prefix)?.is_empty());
            }
        }
    }
    Ok(ctx.scan(table.id, &[])?.iter().any(|(_, row)| {
        columns
            .iter()
            .zip(values)
            .all(|(column, value)| row.get(column) == Some(value))
    }))
}

/// Rejects two index entries with the same key columns. Registered on the
/// data table of a unique index. NULL compares equal to NULL here.
pub struct UniqueIndexVerifier {
    index: NodeId,
    index_name: String,
}

impl UniqueIndexVerifier {
    pub fn new(index: &Index) -> Self {
        Self {
            index: index.id,
            index_name: index.name.clone(),
        }
    }
}

impl Verifier for UniqueIndexVerifier {
    fn verify(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let WriteOp::Insert(entry) = op else {
            return Ok(());
        };
        let index = lookup(ctx.schema().get::<Index>(self.index), "index", self.index)?;
        let prefix = entry.key.prefix(index.key_columns.len());
        if ctx.scan(index.data_table, prefix)?.len() > 1 {
            let table = lookup(ctx.table(index.table), "table", index.table)?;
            return Err(Error::violation(
                &self.index_name,
                &table.name,
                format!(
                    "UNIQUE violation on index {}, duplicate key: {} in this transaction.",
                    self.index_name,
                    render(prefix)
                ),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("UniqueIndexVerifier({})", self.index_name)
    }
}

/// Every written referencing row must find its referenced row.
pub struct ForeignKeyReferencingVerifier {
    foreign_key: NodeId,
    name: String,
}

impl ForeignKeyReferencingVerifier {
    pub fn new(foreign_key: &ForeignKey) -> Self {
        Self {
            foreign_key: foreign_key.id,
            name: foreign_key.name.clone(),
        }
    }
}

impl Verifier for ForeignKeyReferencingVerifier {
    fn verify(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        if op.is_delete() {
            return Ok(());
        }
        let fk = lookup(
            ctx.schema().get::<ForeignKey>(self.foreign_key),
            "foreign key",
            self.foreign_key,
        )?;
        let Some(row) = ctx.read(fk.referencing_table, op.key())? else {
            return Ok(());
        };
        let values: Vec<Value> = fk
            .referencing_columns
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
            .collect();
        if values.iter().any(Value::is_null) {
            return Ok(());
        }
        if has_matching_row(
            ctx,
            fk.referenced_table,
            fk.referenced_index,
            &fk.referenced_columns,
            &values,
        )? {
            return Ok(());
        }
        let referencing = lookup(ctx.table(fk.referencing_table), "table", fk.referencing_table)?;
        let referenced = lookup(ctx.table(fk.referenced_table), "table", fk.referenced_table)?;
        Err(Error::violation(
            &self.name,
            &referencing.name,
            format!(
                "Foreign key {} constraint violation on table {}. Cannot find referenced values {} in table {}.",
                self.name,
                referencing.name,
                render(&values),
                referenced.name
            ),
        ))
    }

    fn describe(&self) -> String {
        format!("ForeignKeyReferencingVerifier({})", self.name)
    }
}

/// A referenced row may only go away when nothing references it anymore.
pub struct ForeignKeyReferencedVerifier {
    foreign_key: NodeId,
    name: String,
}

impl ForeignKeyReferencedVerifier {
    pub fn new(foreign_key: &ForeignKey) -> Self {
        Self {
            foreign_key: foreign_key.id,
            name: foreign_key.name.clone(),
        }
    }
}

impl Verifier for ForeignKeyReferencedVerifier {
    fn verify(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        if matches!(op, WriteOp::Insert(_)) {
            return Ok(());
        }
        let Some(before) = ctx.pre_image() else {
            return Ok(());
        };
        let fk = lookup(
            ctx.schema().get::<ForeignKey>(self.foreign_key),
            "foreign key",
            self.foreign_key,
        )?;
        let values: Vec<Value> = fk
            .referenced_columns
            .iter()
            .map(|c| before.get(c).cloned().unwrap_or(Value::Null))
            .collect();
        if values.iter().any(Value::is_null) {
            return Ok(());
        }
        if has_matching_row(
            ctx,
            fk.referenced_table,
            fk.referenced_index,
            &fk.referenced_columns,
            &values,
        )? {
            return Ok(());
        }
        if !has_matching_row(
            ctx,
            fk.referencing_table,
            fk.referencing_index,
            &fk.referencing_columns,
            &values,
        )? {
            return Ok(());
        }
        let referencing = lookup(ctx.table(fk.referencing_table), "table", fk.referencing_table)?;
        let referenced = lookup(ctx.table(fk.referenced_table), "table", fk.referenced_table)?;
        Err(Error::violation(
            &self.name,
            &referenced.name,
            format!(
                "Foreign key {} constraint violation when deleting or updating referenced row(s): referencing row(s) found in table {}.",
                self.name, referencing.name
            ),
        ))
    }

    fn describe(&self) -> String {
        format!("ForeignKeyReferencedVerifier({})", self.name)
    }
}

/// Evaluates a check constraint against the final row. NULL passes.
pub struct CheckConstraintVerifier {
    check: NodeId,
    table: NodeId,
    name: String,
}

impl CheckConstraintVerifier {
    pub fn new(check: &CheckConstraint) -> Self {
        Self {
            check: check.id,
            table: check.table,
            name: check.name.clone(),
        }
    }
}

impl Verifier for CheckConstraintVerifier {
    fn verify(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        if op.is_delete() {
            return Ok(());
        }
        let Some(row) = ctx.read(self.table, op.key())? else {
            return Ok(());
        };
        let check = lookup(
            ctx.schema().get::<CheckConstraint>(self.check),
            "check constraint",
            self.check,
        )?;
        let table: &Table = lookup(ctx.table(self.table), "table", self.table)?;
        let scope = row_by_name(&ctx.schema().table_columns(table), &row);
        match ctx.evaluator().evaluate(&check.expression, &scope)? {
            Value::Bool(true) | Value::Null => Ok(()),
            Value::Bool(false) => Err(Error::violation(
                &self.name,
                &table.name,
                format!(
                    "Check constraint `{}`.`{}` is violated for key {}",
                    table.name,
                    self.name,
                    op.key()
                ),
            )),
            other => Err(Error::TypeMismatch(format!(
                "Check constraint `{}` evaluated to non-boolean value {}",
                self.name,
                value_to_string(&other)
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("CheckConstraintVerifier({})", self.name)
    }
}
