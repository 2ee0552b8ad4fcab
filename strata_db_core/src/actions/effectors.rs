use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::schema::Schema;
use crate::schema::catalog::{Column, ForeignKey, Index, OnDeleteAction, Sequence, Table};
use crate::schema::graph::NodeId;
use crate::types::value::{Value, coerce_value};

use super::context::{ActionContext, key_of, row_by_name};
use super::modifiers::index_entry;
use super::ops::{DeleteOp, MutationKind, MutationOp, RowOp, WriteOp};
use super::Effector;

fn lookup<'a, T>(found: Option<&'a T>, what: &str, id: NodeId) -> Result<&'a T> {
    found.ok_or_else(|| Error::Internal(format!("{what} {id} is not part of the schema")))
}

/// Next value for an identity column, or its default expression.
fn default_value(
    evaluator: &Evaluator,
    column: &Column,
    scope: &HashMap<String, Value>,
) -> Result<Value> {
    let value = if let Some(sequence_id) = column.identity_sequence {
        let sequence = lookup(
            evaluator.schema().get::<Sequence>(sequence_id),
            "sequence",
            sequence_id,
        )?;
        evaluator.functions().sequences().next_value(sequence)?
    } else if let Some(expression) = &column.default_value {
        evaluator.evaluate(expression, scope)?
    } else {
        Value::Null
    };
    coerce_value(value, &column.data_type)
}

/// Removes the index entry of the row as it was before an update or delete.
/// [`IndexModifier`](super::modifiers::IndexModifier) writes the new entry
/// at commit.
pub struct IndexEffector {
    index: NodeId,
    index_name: String,
}

impl IndexEffector {
    pub fn new(index: &Index) -> Self {
        Self {
            index: index.id,
            index_name: index.name.clone(),
        }
    }
}

impl Effector for IndexEffector {
    fn effect(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        if matches!(op, WriteOp::Insert(_)) {
            return Ok(());
        }
        let Some(before) = ctx.pre_image().cloned() else {
            return Ok(());
        };
        if let Some(entry) = index_entry(ctx, self.index, &before)? {
            ctx.emit(WriteOp::Delete(DeleteOp {
                table: entry.table,
                key: entry.key,
            }));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("IndexEffector({})", self.index_name)
    }
}

/// `ON DELETE CASCADE` for interleaved children.
pub struct InterleaveParentEffector {
    parent_name: String,
    child: NodeId,
    child_name: String,
}

impl InterleaveParentEffector {
    pub fn new(parent: &Table, child: &Table) -> Self {
        Self {
            parent_name: parent.name.clone(),
            child: child.id,
            child_name: child.name.clone(),
        }
    }
}

impl Effector for InterleaveParentEffector {
    fn effect(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let WriteOp::Delete(delete) = op else {
            return Ok(());
        };
        let child = lookup(ctx.table(self.child), "table", self.child)?;
        if child.on_delete != OnDeleteAction::Cascade {
            return Ok(());
        }
        for (key, _) in ctx.scan(self.child, delete.key.values())? {
            ctx.emit(WriteOp::Delete(DeleteOp {
                table: self.child,
                key,
            }));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "InterleaveParentEffector({} -> {})",
            self.parent_name, self.child_name
        )
    }
}

/// `ON DELETE CASCADE` of a foreign key, registered on the referenced table.
pub struct ForeignKeyActionEffector {
    foreign_key: NodeId,
    name: String,
}

impl ForeignKeyActionEffector {
    pub fn new(foreign_key: &ForeignKey) -> Self {
        Self {
            foreign_key: foreign_key.id,
            name: foreign_key.name.clone(),
        }
    }
}

impl Effector for ForeignKeyActionEffector {
    fn effect(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        if !op.is_delete() {
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
        let referenced: Vec<Value> = fk
            .referenced_columns
            .iter()
            .map(|c| before.get(c).cloned().unwrap_or(Value::Null))
            .collect();
        if referenced.iter().any(Value::is_null) {
            return Ok(());
        }
        let mut doomed = Vec::new();
        for (key, row) in ctx.scan(fk.referencing_table, &[])? {
            let matches = fk
                .referencing_columns
                .iter()
                .zip(&referenced)
                .all(|(column, value)| row.get(column) == Some(value));
            if matches {
                doomed.push(key);
            }
        }
        trace!(foreign_key = %self.name, rows = doomed.len(), "cascading delete");
        for key in doomed {
            ctx.emit(WriteOp::Delete(DeleteOp {
                table: fk.referencing_table,
                key,
            }));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ForeignKeyActionEffector({})", self.name)
    }
}

/// Fills a non-key column with a default or identity value when an insert
/// leaves it out.
pub struct ColumnDefaultEffector {
    table: NodeId,
    column: NodeId,
    column_name: String,
}

impl ColumnDefaultEffector {
    pub fn new(column: &Column) -> Self {
        Self {
            table: column.table,
            column: column.id,
            column_name: column.name.clone(),
        }
    }
}

impl Effector for ColumnDefaultEffector {
    fn effect(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let WriteOp::Insert(insert) = op else {
            return Ok(());
        };
        if insert.value_of(self.column).is_some() {
            return Ok(());
        }
        let column = lookup(ctx.column(self.column), "column", self.column)?;
        let table = lookup(ctx.table(self.table), "table", self.table)?;
        let row = op.apply_to(None).unwrap_or_default();
        let scope = row_by_name(&ctx.schema().table_columns(table), &row);
        let value = default_value(ctx.evaluator(), column, &scope)
            .map_err(|e| e.for_column(&column.name))?;
        ctx.emit(WriteOp::Update(RowOp {
            table: self.table,
            key: insert.key.clone(),
            columns: vec![self.column],
            values: vec![value],
        }));
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ColumnDefaultEffector({})", self.column_name)
    }
}

/// Computes generated columns of a table.
///
/// The key variant runs once per mutation, before rows become write
/// operations, and fills key columns that have a default, an identity
/// sequence or a generation expression. The non-key variant runs as an
/// effector and recomputes stored values after every insert or update.
pub struct GeneratedColumnEffector {
    table: NodeId,
    table_name: String,
    for_keys: bool,
    /// Columns to compute, in evaluation order.
    columns: Vec<NodeId>,
}

impl GeneratedColumnEffector {
    pub fn new(schema: &Schema, table: &Table, for_keys: bool) -> Self {
        let all = schema.table_columns(table);
        let mut columns: Vec<NodeId> = Vec::new();
        if for_keys {
            columns.extend(
                table
                    .primary_key
                    .iter()
                    .filter_map(|k| all.iter().find(|c| c.id == k.column))
                    .filter(|c| c.has_default_value())
                    .map(|c| c.id),
            );
        }
        let mut generated: Vec<&Column> = all
            .iter()
            .copied()
            .filter(|c| c.is_generated() && table.is_key_column(c.id) == for_keys)
            .collect();
        // Dependencies first; the table itself rejects cycles.
        while !generated.is_empty() {
            let ready = generated.iter().position(|c| {
                c.generated.as_ref().is_some_and(|g| {
                    g.expression.referenced_columns().iter().all(|dep| {
                        !generated
                            .iter()
                            .any(|other| other.id != c.id && other.name.eq_ignore_ascii_case(dep))
                    })
                })
            });
            let next = generated.remove(ready.unwrap_or(0));
            columns.push(next.id);
        }
        Self {
            table: table.id,
            table_name: table.name.clone(),
            for_keys,
            columns,
        }
    }

    pub fn columns(&self) -> &[NodeId] {
        &self.columns
    }

    /// Computes the key values a mutation leaves out, one row of values per
    /// mutation row, and names the columns they fill.
    pub fn generate_keys(
        &self,
        evaluator: &Evaluator,
        mutation: &MutationOp,
        generated_values: &mut Vec<Vec<Value>>,
        generated_columns: &mut Vec<String>,
    ) -> Result<()> {
        if !self.for_keys
            || !matches!(
                mutation.kind,
                MutationKind::Insert | MutationKind::InsertOrUpdate | MutationKind::Replace
            )
        {
            return Ok(());
        }
        let schema = evaluator.schema();
        let table = lookup(schema.get::<Table>(self.table), "table", self.table)?;
        let all = schema.table_columns(table);
        let targets: Vec<&Column> = self
            .columns
            .iter()
            .filter_map(|id| all.iter().copied().find(|c| c.id == *id))
            .filter(|c| !mutation.columns.iter().any(|m| m.eq_ignore_ascii_case(&c.name)))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        generated_columns.extend(targets.iter().map(|c| c.name.clone()));

        for row in &mutation.rows {
            let mut scope: HashMap<String, Value> = all
                .iter()
                .map(|c| (c.name.to_lowercase(), Value::Null))
                .collect();
            for (name, value) in mutation.columns.iter().zip(row) {
                let value = match all.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
                    Some(column) => coerce_value(value.clone(), &column.data_type)
                        .unwrap_or_else(|_| value.clone()),
                    None => value.clone(),
                };
                scope.insert(name.to_lowercase(), value);
            }
            let mut values = Vec::with_capacity(targets.len());
            for column in &targets {
                let value = match &column.generated {
                    Some(generated) => evaluator
                        .evaluate(&generated.expression, &scope)
                        .and_then(|v| coerce_value(v, &column.data_type)),
                    None => default_value(evaluator, column, &scope),
                }
                .map_err(|e| e.for_column(&column.name))?;
                scope.insert(column.name.to_lowercase(), value.clone());
                values.push(value);
            }
            generated_values.push(values);
        }
        trace!(
            table = %self.table_name,
            rows = generated_values.len(),
            columns = generated_columns.len(),
            "generated key values"
        );
        Ok(())
    }
}

impl Effector for GeneratedColumnEffector {
    fn effect(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        let Some(written) = op.row() else {
            return Ok(());
        };
        if self.for_keys || self.columns.is_empty() {
            return Ok(());
        }
        let Some(mut row) = ctx.current_row(self.table, &written.key)? else {
            return Ok(());
        };
        let table = lookup(ctx.table(self.table), "table", self.table)?;
        let mut scope = row_by_name(&ctx.schema().table_columns(table), &row);
        let mut changed = RowOp {
            table: self.table,
            key: written.key.clone(),
            columns: Vec::new(),
            values: Vec::new(),
        };
        for id in &self.columns {
            let column = lookup(ctx.column(*id), "column", *id)?;
            let Some(generated) = &column.generated else {
                continue;
            };
            let value = ctx
                .evaluator()
                .evaluate(&generated.expression, &scope)
                .and_then(|v| coerce_value(v, &column.data_type))
                .map_err(|e| e.for_column(&column.name))?;
            scope.insert(column.name.to_lowercase(), value.clone());
            if row.get(id) != Some(&value) {
                row.insert(*id, value.clone());
                changed.columns.push(*id);
                changed.values.push(value);
            }
        }
        if !changed.columns.is_empty() {
            debug_assert_eq!(key_of(&table.primary_key_ids(), &row), written.key);
            ctx.emit(WriteOp::Update(changed));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let kind = if self.for_keys { "keys" } else { "columns" };
        format!("GeneratedColumnEffector({}, {kind})", self.table_name)
    }
}
