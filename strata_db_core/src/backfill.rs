//! Runs the data work a schema change requires before the new version is
//! published: verifying existing rows against new constraints, populating
//! new indexes and columns, and cleaning up dropped data.
//!
//! All rows are computed and verified first; storage is only written once
//! every action has succeeded.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::actions::context::row_by_name;
use crate::actions::modifiers::index_entry;
use crate::actions::{ActionContext, StorageReader};
use crate::error::{Error, Result};
use crate::eval::{Evaluator, FunctionCatalog};
use crate::schema::catalog::{CheckConstraint, Column, ForeignKey, Index, Sequence, Table};
use crate::schema::graph::NodeId;
use crate::schema::{Schema, SchemaChangeAction};
use crate::storage::StorageEngine;
use crate::types::value::{Value, coerce_value, value_to_string};
use crate::types::{ColumnValues, Key};

enum SequenceChange {
    Restart(NodeId, i64),
    Forget(NodeId),
}

/// Buffered outcome of the actions: row writes plus sequence changes.
#[derive(Default)]
struct Pending {
    rows: BTreeMap<(NodeId, Key), Option<ColumnValues>>,
    dropped_tables: Vec<NodeId>,
    sequences: Vec<SequenceChange>,
}

impl Pending {
    /// Rows of `table` as the actions so far left them.
    fn scan(&self, storage: &dyn StorageEngine, table: NodeId) -> Result<Vec<(Key, ColumnValues)>> {
        if self.dropped_tables.contains(&table) {
            return Ok(Vec::new());
        }
        let mut rows: BTreeMap<Key, ColumnValues> = storage.scan(table)?.into_iter().collect();
        for ((t, key), row) in &self.rows {
            if *t != table {
                continue;
            }
            match row {
                Some(row) => rows.insert(key.clone(), row.clone()),
                None => rows.remove(key),
            };
        }
        Ok(rows.into_iter().collect())
    }
}

pub fn run_schema_change_actions(
    schema: &Arc<Schema>,
    functions: &Arc<FunctionCatalog>,
    storage: &mut dyn StorageEngine,
    actions: &[SchemaChangeAction],
) -> Result<()> {
    if actions.is_empty() {
        return Ok(());
    }
    let evaluator = Evaluator::new(schema.clone(), functions.clone());
    let mut pending = Pending::default();
    for action in actions {
        debug!(?action, "running schema change action");
        run_action(&evaluator, &*storage, &mut pending, action)?;
    }

    for table in &pending.dropped_tables {
        storage.drop_table(*table)?;
    }
    for ((table, key), row) in pending.rows {
        match row {
            Some(row) => storage.put(table, key, row)?,
            None => storage.delete(table, &key)?,
        }
    }
    for change in pending.sequences {
        match change {
            SequenceChange::Restart(sequence, counter) => {
                functions.sequences().restart(sequence, counter)
            }
            SequenceChange::Forget(sequence) => functions.sequences().forget(sequence),
        }
    }
    Ok(())
}

fn run_action(
    evaluator: &Evaluator,
    storage: &dyn StorageEngine,
    pending: &mut Pending,
    action: &SchemaChangeAction,
) -> Result<()> {
    let schema = evaluator.schema();
    match action {
        SchemaChangeAction::VerifyNotNull { table, column } => {
            let (table, column) = table_column(schema, *table, *column)?;
            for (key, row) in pending.scan(storage, table.id)? {
                if row.get(&column.id).is_none_or(Value::is_null) {
                    return Err(Error::violation(
                        &column.name,
                        &table.name,
                        format!(
                            "Adding a NOT NULL constraint on a column {}.{} that has NULL value(s). First row: {}",
                            table.name, column.name, key
                        ),
                    ));
                }
            }
        }
        SchemaChangeAction::VerifyMaxLength {
            table,
            column,
            max_length,
        } => {
            let (table, column) = table_column(schema, *table, *column)?;
            for (key, row) in pending.scan(storage, table.id)? {
                let length = row.get(&column.id).and_then(Value::declared_length);
                if length.is_some_and(|l| l as i64 > *max_length) {
                    return Err(Error::violation(
                        &column.name,
                        &table.name,
                        format!(
                            "Cannot reduce the length of column {}.{} to {}: row {} holds a longer value.",
                            table.name, column.name, max_length, key
                        ),
                    ));
                }
            }
        }
        SchemaChangeAction::VerifyCheckConstraint { table, check } => {
            let table = get::<Table>(schema, *table, "table")?;
            let check = get::<CheckConstraint>(schema, *check, "check constraint")?;
            let columns = schema.table_columns(table);
            for (key, row) in pending.scan(storage, table.id)? {
                let value = evaluator.evaluate(&check.expression, &row_by_name(&columns, &row))?;
                if value == Value::Bool(false) {
                    return Err(Error::violation(
                        &check.name,
                        &table.name,
                        format!(
                            "Check constraint `{}`.`{}` is violated for key {}",
                            table.name, check.name, key
                        ),
                    ));
                }
            }
        }
        SchemaChangeAction::VerifyForeignKey { foreign_key } => {
            let fk = get::<ForeignKey>(schema, *foreign_key, "foreign key")?;
            if !fk.enforced {
                return Ok(());
            }
            let referenced: Vec<Vec<Value>> = pending
                .scan(storage, fk.referenced_table)?
                .into_iter()
                .map(|(_, row)| cells(&row, &fk.referenced_columns))
                .collect();
            for (_, row) in pending.scan(storage, fk.referencing_table)? {
                let values = cells(&row, &fk.referencing_columns);
                if values.iter().any(Value::is_null) || referenced.contains(&values) {
                    continue;
                }
                let table = get::<Table>(schema, fk.referencing_table, "table")?;
                let parts: Vec<String> = values.iter().map(value_to_string).collect();
                return Err(Error::violation(
                    &fk.name,
                    &table.name,
                    format!(
                        "Foreign key {} constraint violation on table {}. Cannot find referenced values {{{}}}.",
                        fk.name,
                        table.name,
                        parts.join(", ")
                    ),
                ));
            }
        }
        SchemaChangeAction::BackfillIndex { index } => {
            backfill_index(evaluator, storage, pending, *index)?;
        }
        SchemaChangeAction::BackfillColumn { table, column } => {
            let (table, column) = table_column(schema, *table, *column)?;
            let columns = schema.table_columns(table);
            for (key, mut row) in pending.scan(storage, table.id)? {
                let value = column_value(evaluator, column, &row_by_name(&columns, &row))
                    .map_err(|e| e.for_column(&column.name))?;
                row.insert(column.id, value);
                pending.rows.insert((table.id, key), Some(row));
            }
        }
        SchemaChangeAction::DropColumnData { table, column } => {
            // The table itself may be gone from the new schema.
            for (key, mut row) in pending.scan(storage, *table)? {
                if row.remove(column).is_some() {
                    pending.rows.insert((*table, key), Some(row));
                }
            }
        }
        SchemaChangeAction::DropTableData { table } => {
            pending.rows.retain(|(t, _), _| t != table);
            pending.dropped_tables.push(*table);
        }
        SchemaChangeAction::RestartSequence { sequence, counter } => {
            pending.sequences.push(SequenceChange::Restart(*sequence, *counter));
        }
        SchemaChangeAction::ForgetSequence { sequence } => {
            pending.sequences.push(SequenceChange::Forget(*sequence));
        }
    }
    Ok(())
}

fn backfill_index(
    evaluator: &Evaluator,
    storage: &dyn StorageEngine,
    pending: &mut Pending,
    index_id: NodeId,
) -> Result<()> {
    let schema = evaluator.schema();
    let index = get::<Index>(schema, index_id, "index")?;
    let reader = StorageReader(storage);
    let ctx = ActionContext::new(evaluator, &reader);
    let mut seen: BTreeMap<Vec<Value>, Key> = BTreeMap::new();
    for (key, row) in pending.scan(storage, index.table)? {
        let Some(entry) = index_entry(&ctx, index.id, &row)? else {
            continue;
        };
        if index.unique {
            let prefix = entry.key.prefix(index.key_columns.len()).to_vec();
            if let Some(other) = seen.insert(prefix.clone(), key.clone()) {
                let table = get::<Table>(schema, index.table, "table")?;
                let parts: Vec<String> = prefix.iter().map(value_to_string).collect();
                return Err(Error::violation(
                    &index.name,
                    &table.name,
                    format!(
                        "Found uniqueness violation on index {}, duplicate key: {{{}}} in rows {} and {}.",
                        index.name,
                        parts.join(", "),
                        other,
                        key
                    ),
                ));
            }
        }
        let cells: ColumnValues = entry.cells().map(|(c, v)| (c, v.clone())).collect();
        pending.rows.insert((entry.table, entry.key), Some(cells));
    }
    Ok(())
}

/// Default, identity or generated value of `column` for an existing row.
fn column_value(
    evaluator: &Evaluator,
    column: &Column,
    scope: &HashMap<String, Value>,
) -> Result<Value> {
    let value = if let Some(generated) = &column.generated {
        evaluator.evaluate(&generated.expression, scope)?
    } else if let Some(sequence) = column.identity_sequence {
        let sequence = get::<Sequence>(evaluator.schema(), sequence, "sequence")?;
        evaluator.functions().sequences().next_value(sequence)?
    } else if let Some(default) = &column.default_value {
        evaluator.evaluate(default, scope)?
    } else {
        Value::Null
    };
    coerce_value(value, &column.data_type)
}

fn cells(row: &ColumnValues, columns: &[NodeId]) -> Vec<Value> {
    columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
        .collect()
}

fn get<'s, T: crate::schema::NodeVariant>(schema: &'s Schema, id: NodeId, what: &str) -> Result<&'s T> {
    schema
        .get::<T>(id)
        .ok_or_else(|| Error::Internal(format!("{what} {id} is not part of the schema")))
}

fn table_column(schema: &Schema, table: NodeId, column: NodeId) -> Result<(&Table, &Column)> {
    Ok((
        get::<Table>(schema, table, "table")?,
        get::<Column>(schema, column, "column")?,
    ))
}
