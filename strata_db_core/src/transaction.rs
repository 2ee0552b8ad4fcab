//! Buffered read-write transactions that drive the action phases.
//!
//! Writes are staged in a persistent map. Every mutation checkpoints the
//! buffer first, so a failing mutation leaves the transaction exactly as it
//! was. Nothing reaches storage before [`Transaction::commit`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use im::{OrdMap, Vector};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, trace};

use crate::actions::context::{key_of, RowReader};
use crate::actions::{ActionContext, ActionRegistry, MutationKind, MutationOp, RowOp, WriteOp, DeleteOp};
use crate::error::{Error, Result};
use crate::schema::catalog::{Column, Table};
use crate::schema::graph::NodeId;
use crate::schema::Schema;
use crate::storage::StorageEngine;
use crate::types::value::{Value, coerce_value};
use crate::types::{ColumnValues, Key};

type Staged = OrdMap<(NodeId, Key), Option<ColumnValues>>;

/// Phase of the write pipeline, as recorded in the transaction trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validate,
    GenerateKeys,
    Stage,
    Effect,
    Modify,
    Verify,
    Apply,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::GenerateKeys => "generate_keys",
            Phase::Stage => "stage",
            Phase::Effect => "effect",
            Phase::Modify => "modify",
            Phase::Verify => "verify",
            Phase::Apply => "apply",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub phase: Phase,
    pub table: String,
}

#[derive(Debug, Clone)]
struct StagedOp {
    op: WriteOp,
    /// Row before the op was staged.
    pre_image: Option<ColumnValues>,
}

/// Staged rows layered over committed storage.
struct TxnView<'a> {
    staged: Staged,
    storage: &'a dyn StorageEngine,
}

impl RowReader for TxnView<'_> {
    fn read_row(&self, table: NodeId, key: &Key) -> Result<Option<ColumnValues>> {
        match self.staged.get(&(table, key.clone())) {
            Some(row) => Ok(row.clone()),
            None => self.storage.read(table, key),
        }
    }

    fn scan_rows(&self, table: NodeId, prefix: &[Value]) -> Result<Vec<(Key, ColumnValues)>> {
        let mut rows: BTreeMap<Key, ColumnValues> =
            self.storage.scan_prefix(table, prefix)?.into_iter().collect();
        let start = (table, Key::new(prefix.to_vec()));
        for ((staged_table, key), row) in self.staged.range(start..) {
            if *staged_table != table || !key.starts_with(prefix) {
                break;
            }
            match row {
                Some(row) => rows.insert(key.clone(), row.clone()),
                None => rows.remove(key),
            };
        }
        Ok(rows.into_iter().collect())
    }
}

pub struct Transaction<'db> {
    schema: Arc<Schema>,
    registry: Arc<ActionRegistry>,
    storage: &'db RwLock<Box<dyn StorageEngine>>,
    staged: Staged,
    log: Vector<StagedOp>,
    trace: Vec<TraceEvent>,
}

impl<'db> Transaction<'db> {
    pub fn new(registry: Arc<ActionRegistry>, storage: &'db RwLock<Box<dyn StorageEngine>>) -> Self {
        Self {
            schema: registry.schema().clone(),
            registry,
            storage,
            staged: OrdMap::new(),
            log: Vector::new(),
            trace: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Phases executed so far, in order.
    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Applies a client mutation. On error the transaction is unchanged.
    pub fn write(&mut self, mutation: &MutationOp) -> Result<()> {
        let staged = self.staged.clone();
        let log = self.log.clone();
        let trace_len = self.trace.len();
        let lock = self.storage;
        let storage = lock.read();
        let result = self.apply_mutation(&**storage, mutation);
        if result.is_err() {
            self.staged = staged;
            self.log = log;
            self.trace.truncate(trace_len);
        }
        result
    }

    /// Reads `columns` of the row stored under `key`, staged writes included.
    pub fn read(&self, table: &str, key: &[Value], columns: &[&str]) -> Result<Option<Vec<Value>>> {
        let table = find_table(&self.schema, table)?;
        let columns = resolve_columns(&self.schema, table, columns)?;
        let key = self.coerce_key(table, key)?;
        let storage = self.storage.read();
        let row = self.view(&**storage).read_row(table.id, &key)?;
        Ok(row.map(|row| project(&row, &columns)))
    }

    /// Every row of `table` in key order, projected onto `columns`.
    pub fn scan(&self, table: &str, columns: &[&str]) -> Result<Vec<Vec<Value>>> {
        let table = find_table(&self.schema, table)?;
        let columns = resolve_columns(&self.schema, table, columns)?;
        let storage = self.storage.read();
        let rows = self.view(&**storage).scan_rows(table.id, &[])?;
        Ok(rows.iter().map(|(_, row)| project(row, &columns)).collect())
    }

    /// Runs modifiers and verifiers, then applies the buffer to storage.
    /// Storage is left untouched when any of them fails.
    pub fn commit(mut self) -> Result<Vec<TraceEvent>> {
        let lock = self.storage;
        let storage = lock.upgradable_read();

        let mut modified = Vec::new();
        {
            let view = self.view(&**storage);
            for staged in self.log.iter() {
                let mut ctx = ActionContext::new(self.registry.evaluator(), &view)
                    .with_pre_image(staged.pre_image.clone())
                    .internal(true);
                self.registry.execute_modifiers(&mut ctx, &staged.op)?;
                modified.extend(ctx.take_effects());
            }
        }
        for op in &modified {
            self.record(Phase::Modify, op.table());
            self.staged
                .insert((op.table(), op.key().clone()), op.apply_to(None));
        }

        {
            let view = self.view(&**storage);
            let ops = self
                .log
                .iter()
                .map(|s| (&s.op, s.pre_image.clone()))
                .chain(modified.iter().map(|op| (op, None)));
            for (op, pre_image) in ops {
                let ctx = ActionContext::new(self.registry.evaluator(), &view)
                    .with_pre_image(pre_image)
                    .internal(true);
                self.registry.execute_verifiers(&ctx, op)?;
            }
        }
        let verified: Vec<NodeId> = self.log.iter().map(|s| s.op.table()).collect();
        for table in verified {
            self.record(Phase::Verify, table);
        }

        let mut storage = RwLockUpgradableReadGuard::upgrade(storage);
        for ((table, key), row) in self.staged.iter() {
            match row {
                Some(row) => storage.put(*table, key.clone(), row.clone())?,
                None => storage.delete(*table, key)?,
            }
        }
        self.trace.push(TraceEvent {
            phase: Phase::Apply,
            table: String::new(),
        });
        debug!(
            version = %self.schema.version(),
            rows = self.staged.len(),
            "committed transaction"
        );
        Ok(self.trace)
    }

    fn apply_mutation(&mut self, storage: &dyn StorageEngine, mutation: &MutationOp) -> Result<()> {
        let schema = self.schema.clone();
        let table = find_table(&schema, &mutation.table)?;
        let names: Vec<&str> = mutation.columns.iter().map(String::as_str).collect();
        let columns = resolve_columns(&schema, table, &names)?;
        let key_ids = table.primary_key_ids();

        let mut rows = Vec::with_capacity(mutation.rows.len());
        for values in &mutation.rows {
            if values.len() != columns.len() {
                return Err(Error::InvalidArgument(format!(
                    "Mutation on table {} lists {} columns but a row has {} values.",
                    table.name,
                    columns.len(),
                    values.len()
                )));
            }
            let cells: Vec<(NodeId, Value)> = columns
                .iter()
                .zip(values)
                .map(|(column, value)| {
                    let value = coerce_value(value.clone(), &column.data_type)
                        .unwrap_or_else(|_| value.clone());
                    (column.id, value)
                })
                .collect();
            rows.push(cells);
        }

        if mutation.kind == MutationKind::Delete {
            let given: BTreeSet<NodeId> = columns.iter().map(|c| c.id).collect();
            let expected: BTreeSet<NodeId> = key_ids.iter().copied().collect();
            if given != expected {
                return Err(Error::InvalidArgument(format!(
                    "Delete on table {} must list exactly its primary key columns.",
                    table.name
                )));
            }
            for cells in rows {
                let row: ColumnValues = cells.into_iter().collect();
                let op = WriteOp::Delete(DeleteOp {
                    table: table.id,
                    key: key_of(&key_ids, &row),
                });
                self.process(storage, op, true, false)?;
            }
            return Ok(());
        }

        let inserting = matches!(
            mutation.kind,
            MutationKind::Insert | MutationKind::InsertOrUpdate | MutationKind::Replace
        );
        let pending = if inserting {
            self.registry.pending_key_columns(mutation)
        } else {
            BTreeSet::new()
        };

        for cells in &rows {
            let op = self.provisional_op(storage, table, &key_ids, cells, mutation.kind, &pending)?;
            {
                let view = self.view(storage);
                let ctx = ActionContext::new(self.registry.evaluator(), &view)
                    .with_pending_key_columns(pending.clone());
                self.registry.execute_validators(&ctx, &op)?;
            }
            self.record(Phase::Validate, table.id);
        }

        let mut generated_values = Vec::new();
        let mut generated_columns = Vec::new();
        if !pending.is_empty() {
            self.registry.execute_generated_key_effectors(
                mutation,
                &mut generated_values,
                &mut generated_columns,
            )?;
            self.record(Phase::GenerateKeys, table.id);
        }
        let generated_ids: Vec<NodeId> = generated_columns
            .iter()
            .map(|name| {
                schema
                    .find_column(table, name)
                    .map(|c| c.id)
                    .ok_or_else(|| Error::Internal(format!("generated column {name} is unknown")))
            })
            .collect::<Result<_>>()?;

        let generated_key = !pending.is_empty();
        for (i, mut cells) in rows.into_iter().enumerate() {
            if let Some(values) = generated_values.get(i) {
                cells.extend(generated_ids.iter().copied().zip(values.iter().cloned()));
            }
            let row: ColumnValues = cells.iter().cloned().collect();
            let key = key_of(&key_ids, &row);
            let (columns, values): (Vec<NodeId>, Vec<Value>) = cells.into_iter().unzip();
            let row_op = RowOp {
                table: table.id,
                key: key.clone(),
                columns,
                values,
            };
            let exists = self.view(storage).read_row(table.id, &key)?.is_some();
            let mut recheck = generated_key;
            let op = match mutation.kind {
                MutationKind::Insert => WriteOp::Insert(row_op),
                MutationKind::Update => WriteOp::Update(row_op),
                MutationKind::InsertOrUpdate if exists => WriteOp::Update(row_op),
                MutationKind::InsertOrUpdate => WriteOp::Insert(row_op),
                MutationKind::Replace if exists => {
                    let delete = WriteOp::Delete(DeleteOp {
                        table: table.id,
                        key,
                    });
                    self.process(storage, delete, true, false)?;
                    recheck = true;
                    WriteOp::Insert(row_op)
                }
                MutationKind::Replace => WriteOp::Insert(row_op),
                MutationKind::Delete => {
                    return Err(Error::Internal("delete mutations are keyed, not written".to_string()));
                }
            };
            if recheck {
                self.revalidate(storage, &op)?;
            }
            self.process(storage, op, false, false)?;
        }
        Ok(())
    }

    /// Validates the final row of a write again once generated key values
    /// are filled in or a replaced row is re-inserted. Client cells were
    /// checked in the first pass; the rest count as internal writes.
    fn revalidate(&mut self, storage: &dyn StorageEngine, op: &WriteOp) -> Result<()> {
        let table = op.table();
        let pre_image = self.view(storage).read_row(table, op.key())?;
        {
            let view = self.view(storage);
            let ctx = ActionContext::new(self.registry.evaluator(), &view)
                .with_pre_image(pre_image)
                .internal(true);
            self.registry.execute_validators(&ctx, op)?;
        }
        self.record(Phase::Validate, table);
        Ok(())
    }

    /// The op a row stands for before generated key values are known.
    fn provisional_op(
        &self,
        storage: &dyn StorageEngine,
        table: &Table,
        key_ids: &[NodeId],
        cells: &[(NodeId, Value)],
        kind: MutationKind,
        pending: &BTreeSet<NodeId>,
    ) -> Result<WriteOp> {
        let row: ColumnValues = cells.iter().cloned().collect();
        let row_op = RowOp {
            table: table.id,
            key: key_of(key_ids, &row),
            columns: cells.iter().map(|(c, _)| *c).collect(),
            values: cells.iter().map(|(_, v)| v.clone()).collect(),
        };
        let exists = match kind {
            MutationKind::InsertOrUpdate | MutationKind::Replace if pending.is_empty() => {
                self.view(storage).read_row(table.id, &row_op.key)?.is_some()
            }
            _ => false,
        };
        Ok(match kind {
            MutationKind::Update => WriteOp::Update(row_op),
            MutationKind::InsertOrUpdate | MutationKind::Replace if exists => WriteOp::Update(row_op),
            _ => WriteOp::Insert(row_op),
        })
    }

    /// Validates (when asked), stages and runs effectors for one write,
    /// then feeds the effects back through the same steps.
    fn process(
        &mut self,
        storage: &dyn StorageEngine,
        op: WriteOp,
        validate: bool,
        internal: bool,
    ) -> Result<()> {
        let table = op.table();
        let pre_image = self.view(storage).read_row(table, op.key())?;
        if validate {
            {
                let view = self.view(storage);
                let ctx = ActionContext::new(self.registry.evaluator(), &view)
                    .with_pre_image(pre_image.clone())
                    .internal(internal);
                self.registry.execute_validators(&ctx, &op)?;
            }
            self.record(Phase::Validate, table);
        }

        self.stage(&op, pre_image.clone())?;

        let effects = {
            let view = self.view(storage);
            let mut ctx = ActionContext::new(self.registry.evaluator(), &view)
                .with_pre_image(pre_image)
                .internal(internal);
            self.registry.execute_effectors(&mut ctx, &op)?;
            ctx.take_effects()
        };
        self.record(Phase::Effect, table);
        for effect in effects {
            trace!(op = effect.kind_str(), table = %effect.table(), "applying effect");
            self.process(storage, effect, true, true)?;
        }
        Ok(())
    }

    fn stage(&mut self, op: &WriteOp, current: Option<ColumnValues>) -> Result<()> {
        let table = op.table();
        match op {
            WriteOp::Insert(insert) if current.is_some() => {
                return Err(Error::AlreadyExists(format!(
                    "Row {} in table {} already exists",
                    insert.key,
                    self.table_name(table)
                )));
            }
            WriteOp::Update(update) if current.is_none() => {
                return Err(Error::NotFound(format!(
                    "Row {} in table {} is missing. Row cannot be updated.",
                    update.key,
                    self.table_name(table)
                )));
            }
            _ => {}
        }
        self.staged
            .insert((table, op.key().clone()), op.apply_to(current.clone()));
        self.log.push_back(StagedOp {
            op: op.clone(),
            pre_image: current,
        });
        self.record(Phase::Stage, table);
        Ok(())
    }

    fn view<'a>(&self, storage: &'a dyn StorageEngine) -> TxnView<'a> {
        TxnView {
            staged: self.staged.clone(),
            storage,
        }
    }

    fn record(&mut self, phase: Phase, table: NodeId) {
        let table = self.table_name(table);
        self.trace.push(TraceEvent { phase, table });
    }

    fn table_name(&self, table: NodeId) -> String {
        self.schema
            .get::<Table>(table)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| table.to_string())
    }

    fn coerce_key(&self, table: &Table, key: &[Value]) -> Result<Key> {
        if key.len() != table.primary_key.len() {
            return Err(Error::InvalidArgument(format!(
                "Key of table {} has {} columns, got {} values.",
                table.name,
                table.primary_key.len(),
                key.len()
            )));
        }
        let values = table
            .primary_key
            .iter()
            .zip(key)
            .map(|(part, value)| match self.schema.get::<Column>(part.column) {
                Some(column) => coerce_value(value.clone(), &column.data_type),
                None => Ok(value.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Key::new(values))
    }
}

fn find_table<'s>(schema: &'s Schema, name: &str) -> Result<&'s Table> {
    schema
        .find_table(name)
        .ok_or_else(|| Error::NotFound(format!("Table not found: {name}")))
}

fn resolve_columns<'s>(schema: &'s Schema, table: &Table, names: &[&str]) -> Result<Vec<&'s Column>> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let column = schema.find_column(table, name).ok_or_else(|| {
            Error::NotFound(format!("Column not found: {}.{}", table.name, name))
        })?;
        if !seen.insert(column.id) {
            return Err(Error::InvalidArgument(format!(
                "Column {} is listed twice for table {}.",
                column.name, table.name
            )));
        }
        columns.push(column);
    }
    Ok(columns)
}

fn project(row: &ColumnValues, columns: &[&Column]) -> Vec<Value> {
    columns
        .iter()
        .map(|c| row.get(&c.id).cloned().unwrap_or(Value::Null))
        .collect()
}
