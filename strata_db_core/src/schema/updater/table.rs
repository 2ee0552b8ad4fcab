use crate::error::{Error, Result};
use crate::eval::Expression;
use crate::schema::catalog::{
    CheckConstraint, Column, GeneratedColumn, Index, KeyColumn, Sequence, SequenceKind, Table,
};
use crate::schema::context::SchemaChangeAction;
use crate::schema::ddl::{
    AlterTable, AlterTableAction, CheckDef, ColumnDef, CreateTable, DropObject, KeyPart,
};
use crate::schema::graph::NodeId;
use crate::schema::names::split_schema_name;
use crate::schema::node::{GLOBAL_SCOPE, SchemaNode};

use super::{Updater, fingerprint, qualify_like};

impl Updater<'_> {
    pub(super) fn create_table(&mut self, stmt: &CreateTable) -> Result<()> {
        if stmt.if_not_exists && self.base.find_table(&stmt.name).is_some() {
            return Ok(());
        }
        let table_id = self.editor.allocate_id();
        let mut table = Table::new(table_id, &stmt.name);
        if let Some(interleave) = &stmt.interleave_in_parent {
            table.parent = Some(self.base_table(&interleave.parent)?.id);
            table.on_delete = interleave.on_delete;
        }
        table.synonym = stmt.synonym.clone();
        table.row_deletion_policy = stmt.row_deletion_policy.clone();
        if let Some(group) = &stmt.locality_group {
            table.locality_group = Some(self.locality_group_id(group)?);
        }
        self.editor.add_node(table);

        for def in &stmt.columns {
            self.add_column(table_id, def)?;
        }
        let primary_key = self.key_columns(table_id, &stmt.primary_key)?;
        self.editor.edit_node::<Table>(table_id, |t| {
            t.primary_key = primary_key;
            Ok(())
        })?;
        for fk in &stmt.foreign_keys {
            self.add_foreign_key(table_id, fk)?;
        }
        for check in &stmt.check_constraints {
            self.add_check(table_id, check)?;
        }
        Ok(())
    }

    pub(super) fn drop_table(&mut self, stmt: &DropObject) -> Result<()> {
        let Some(table) = self.base.find_table(&stmt.name) else {
            if stmt.if_exists {
                return Ok(());
            }
            return Err(Error::schema(format!("Table not found: {}", stmt.name)));
        };
        let indexes: Vec<&str> = table
            .indexes
            .iter()
            .filter_map(|id| self.base.get::<Index>(*id))
            .filter(|index| !index.is_managed())
            .map(|index| index.name.as_str())
            .collect();
        if !indexes.is_empty() {
            return Err(Error::schema(format!(
                "Cannot drop table {} with indices: {}.",
                table.name,
                indexes.join(", ")
            )));
        }
        self.editor.delete_node(table.id)
    }

    pub(super) fn alter_table(&mut self, stmt: &AlterTable) -> Result<()> {
        let table_id = self.base_table(&stmt.table)?.id;
        match &stmt.action {
            AlterTableAction::AddColumn {
                column,
                if_not_exists,
            } => {
                if *if_not_exists && self.column_by_name(table_id, &column.name).is_ok() {
                    return Ok(());
                }
                self.add_column(table_id, column).map(|_| ())
            }
            AlterTableAction::DropColumn { column } => {
                let column = self.column_by_name(table_id, column)?;
                if self.table(table_id)?.is_key_column(column.id) {
                    return Err(Error::schema(format!(
                        "Cannot drop key column {}.",
                        column.name
                    )));
                }
                let id = column.id;
                self.editor.delete_node(id)
            }
            AlterTableAction::AlterColumn { column } => self.alter_column(table_id, column),
            AlterTableAction::AddForeignKey { foreign_key } => {
                self.add_foreign_key(table_id, foreign_key).map(|_| ())
            }
            AlterTableAction::AddCheckConstraint { check } => {
                self.add_check(table_id, check).map(|_| ())
            }
            AlterTableAction::DropConstraint { name } => self.drop_constraint(table_id, name),
            AlterTableAction::SetOnDelete { on_delete } => {
                let on_delete = *on_delete;
                self.editor.edit_node::<Table>(table_id, |t| {
                    if t.parent.is_none() {
                        return Err(Error::schema(format!(
                            "Table {} is not interleaved, so its ON DELETE action cannot be set.",
                            t.name
                        )));
                    }
                    t.on_delete = on_delete;
                    Ok(())
                })
            }
            AlterTableAction::AddRowDeletionPolicy { policy } => {
                let policy = policy.clone();
                self.editor.edit_node::<Table>(table_id, |t| {
                    if t.row_deletion_policy.is_some() {
                        return Err(Error::schema(format!(
                            "Table {} already has a row deletion policy.",
                            t.name
                        )));
                    }
                    t.row_deletion_policy = Some(policy);
                    Ok(())
                })
            }
            AlterTableAction::ReplaceRowDeletionPolicy { policy } => {
                let policy = policy.clone();
                self.editor.edit_node::<Table>(table_id, |t| {
                    if t.row_deletion_policy.is_none() {
                        return Err(Error::schema(format!(
                            "Table {} does not have a row deletion policy.",
                            t.name
                        )));
                    }
                    t.row_deletion_policy = Some(policy);
                    Ok(())
                })
            }
            AlterTableAction::DropRowDeletionPolicy => {
                self.editor.edit_node::<Table>(table_id, |t| {
                    if t.row_deletion_policy.take().is_none() {
                        return Err(Error::schema(format!(
                            "Table {} does not have a row deletion policy.",
                            t.name
                        )));
                    }
                    Ok(())
                })
            }
            AlterTableAction::RenameTo { new_name, synonym } => {
                let (new_name, synonym) = (new_name.clone(), synonym.clone());
                self.editor.edit_node::<Table>(table_id, |t| {
                    if synonym.is_some() && t.synonym.is_some() {
                        return Err(Error::schema(format!(
                            "Table {} already has a synonym.",
                            t.name
                        )));
                    }
                    t.name = new_name;
                    if synonym.is_some() {
                        t.synonym = synonym;
                    }
                    Ok(())
                })
            }
            AlterTableAction::AddSynonym { synonym } => {
                let synonym = synonym.clone();
                self.editor.edit_node::<Table>(table_id, |t| {
                    if t.synonym.is_some() {
                        return Err(Error::schema(format!(
                            "Table {} already has a synonym.",
                            t.name
                        )));
                    }
                    t.synonym = Some(synonym);
                    Ok(())
                })
            }
            AlterTableAction::DropSynonym { synonym } => {
                let synonym = synonym.clone();
                self.editor.edit_node::<Table>(table_id, |t| {
                    match &t.synonym {
                        Some(existing) if existing.eq_ignore_ascii_case(&synonym) => {
                            t.synonym = None;
                            Ok(())
                        }
                        _ => Err(Error::schema(format!(
                            "Synonym {synonym} not found on table {}.",
                            t.name
                        ))),
                    }
                })
            }
            AlterTableAction::SetLocalityGroup { locality_group } => {
                let group = locality_group
                    .as_deref()
                    .map(|name| self.locality_group_id(name))
                    .transpose()?;
                self.editor.edit_node::<Table>(table_id, |t| {
                    t.locality_group = group;
                    Ok(())
                })
            }
        }
    }

    pub(super) fn locality_group_id(&self, name: &str) -> Result<NodeId> {
        self.base
            .find_locality_group(name)
            .map(|g| g.id)
            .ok_or_else(|| Error::schema(format!("Locality group not found: {name}")))
    }

    pub(super) fn key_columns(&self, table: NodeId, parts: &[KeyPart]) -> Result<Vec<KeyColumn>> {
        parts
            .iter()
            .map(|part| {
                Ok(KeyColumn {
                    column: self.column_by_name(table, &part.column)?.id,
                    descending: part.descending,
                    nulls_last: part.nulls_last,
                })
            })
            .collect()
    }

    pub(super) fn sequence_kind(&self, explicit: Option<SequenceKind>) -> (SequenceKind, bool) {
        match explicit {
            Some(kind) => (kind, false),
            None => (
                self.base
                    .database_options()
                    .and_then(|options| options.default_sequence_kind())
                    .unwrap_or_default(),
                true,
            ),
        }
    }

    fn sequence_ids(&self, expression: &Expression) -> Result<Vec<NodeId>> {
        expression
            .referenced_sequences()
            .iter()
            .map(|name| {
                self.base
                    .find_sequence(name, true)
                    .map(|s| s.id)
                    .ok_or_else(|| Error::schema(format!("Sequence not found: {name}")))
            })
            .collect()
    }

    // Copies the attributes of `def` that can be set or changed on a column.
    fn fill_column(&self, column: &mut Column, def: &ColumnDef) -> Result<()> {
        let parse = |text: &str| {
            Expression::parse(text).map_err(|e| {
                Error::schema(format!("Invalid expression for column {}: {e}", def.name))
            })
        };
        column.data_type = def.data_type.clone();
        column.nullable = !def.not_null;
        column.max_length = def.length;
        column.default_value = def.default.as_deref().map(parse).transpose()?;
        column.sequences_used = match &column.default_value {
            Some(expression) => self.sequence_ids(expression)?,
            None => Vec::new(),
        };
        column.generated = def
            .generated
            .as_ref()
            .map(|g| {
                parse(&g.expression).map(|expression| GeneratedColumn {
                    expression,
                    stored: g.stored,
                })
            })
            .transpose()?;
        column.allows_commit_timestamp = def.allow_commit_timestamp;
        column.placement_key = def.placement_key;
        column.hidden = def.hidden;
        Ok(())
    }

    fn add_column(&mut self, table_id: NodeId, def: &ColumnDef) -> Result<NodeId> {
        let id = self.editor.allocate_id();
        let mut column = Column::new(id, &def.name, table_id, def.data_type.clone());
        self.fill_column(&mut column, def)?;
        if let Some(identity) = &def.identity {
            let sequence_id = self.editor.allocate_id();
            let (kind, uses_default_kind) = self.sequence_kind(identity.kind);
            self.editor.add_node(Sequence {
                id: sequence_id,
                name: format!("_identity_seq_{}", id.raw()),
                kind,
                uses_default_kind,
                start_with_counter: identity.start_with_counter,
                skip_range: identity.skip_range,
                internal: true,
            });
            column.identity_sequence = Some(sequence_id);
        }
        self.editor.add_node(column);
        self.editor.edit_node::<Table>(table_id, |t| {
            t.columns.push(id);
            Ok(())
        })?;
        Ok(id)
    }

    fn alter_column(&mut self, table_id: NodeId, def: &ColumnDef) -> Result<()> {
        let current = self.column_by_name(table_id, &def.name)?.clone();
        let mut updated = current.clone();
        self.fill_column(&mut updated, def)?;

        match (&def.identity, current.identity_sequence) {
            (Some(identity), Some(sequence_id)) => {
                let restart = identity.start_with_counter;
                let skip_range = identity.skip_range;
                let previous = self
                    .editor
                    .get_as::<Sequence>(sequence_id)
                    .and_then(|s| s.start_with_counter);
                self.editor.edit_node::<Sequence>(sequence_id, |s| {
                    s.start_with_counter = restart.or(s.start_with_counter);
                    s.skip_range = skip_range;
                    Ok(())
                })?;
                if let Some(counter) = restart.filter(|c| Some(*c) != previous) {
                    self.extra_actions.push(SchemaChangeAction::RestartSequence {
                        sequence: sequence_id,
                        counter,
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(Error::schema(format!(
                    "Cannot convert column {} to or from an identity column.",
                    current.name
                )));
            }
        }

        self.editor.edit_node::<Column>(current.id, |c| {
            *c = updated;
            Ok(())
        })
    }

    pub(super) fn add_check(&mut self, table_id: NodeId, def: &CheckDef) -> Result<NodeId> {
        let expression = Expression::parse(&def.expression).map_err(|e| {
            Error::schema(format!("Invalid check constraint expression: {e}"))
        })?;
        let mut dependent_columns = Vec::new();
        for name in expression.referenced_columns() {
            dependent_columns.push(self.column_by_name(table_id, &name)?.id);
        }
        let table_name = self.table(table_id)?.name.clone();
        let (name, generated_name) = match &def.name {
            Some(name) => (name.clone(), false),
            None => {
                let fp = fingerprint(&table_name);
                let (_, object) = split_schema_name(&table_name);
                let name = self.unused_name(|n| {
                    qualify_like(&table_name, format!("CK_{object}_{fp}_{n}"))
                });
                (name, true)
            }
        };
        let id = self.editor.allocate_id();
        self.editor.add_node(CheckConstraint {
            id,
            name,
            generated_name,
            table: table_id,
            expression,
            dependent_columns,
        });
        self.editor.edit_node::<Table>(table_id, |t| {
            t.check_constraints.push(id);
            Ok(())
        })?;
        Ok(id)
    }

    fn drop_constraint(&mut self, table_id: NodeId, name: &str) -> Result<()> {
        let graph = self.base.graph();
        let node = graph
            .find_name(GLOBAL_SCOPE, name)
            .and_then(|id| graph.get(id));
        let id = match node {
            Some(SchemaNode::ForeignKey(fk)) if fk.referencing_table == table_id => fk.id,
            Some(SchemaNode::CheckConstraint(check)) if check.table == table_id => check.id,
            _ => {
                return Err(Error::schema(format!(
                    "{name} is not a constraint in {}",
                    self.table(table_id)?.name
                )));
            }
        };
        self.editor.delete_node(id)
    }

    /// First generated name, numbered from 1, not used by any node.
    pub(super) fn unused_name(&self, candidate: impl Fn(usize) -> String) -> String {
        let graph = self.editor.graph();
        (1..)
            .map(candidate)
            .find(|name| !graph.iter().any(|node| node.name().eq_ignore_ascii_case(name)))
            .unwrap_or_default()
    }
}
