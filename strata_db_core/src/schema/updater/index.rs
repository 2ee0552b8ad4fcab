use crate::error::{Error, Result};
use crate::schema::catalog::foreign_key::same_column_set;
use crate::schema::catalog::{Column, ForeignKey, Index, KeyColumn, Table};
use crate::schema::ddl::{CreateIndex, DropObject, ForeignKeyDef};
use crate::schema::facade::FINGERPRINT_LENGTH;
use crate::schema::graph::NodeId;
use crate::schema::names::{MAX_NAME_LENGTH, split_schema_name};

use super::{Updater, fingerprint, qualify_like};

/// Name of the index a foreign key creates on `table` over `columns`:
/// `IDX_<table>_<columns>_<U|N>_<fingerprint>`, in the table's schema.
pub fn managed_index_name(table: &str, columns: &[String], unique: bool) -> String {
    let (schema, object) = split_schema_name(table);
    let marker = if unique { "U" } else { "N" };
    let mut prefix = format!("IDX_{object}_{}_{marker}_", columns.join("_"));
    let qualifier = if schema.is_empty() { 0 } else { schema.len() + 1 };
    let limit = MAX_NAME_LENGTH - FINGERPRINT_LENGTH - qualifier;
    if prefix.len() > limit {
        prefix = prefix.chars().take(limit.saturating_sub(1)).collect();
        prefix.push('_');
    }
    let fp = fingerprint(&format!("{table}|{}|{marker}", columns.join(",")));
    qualify_like(table, format!("{prefix}{fp}"))
}

struct IndexPlan {
    name: String,
    table: NodeId,
    key_columns: Vec<KeyColumn>,
    stored_columns: Vec<NodeId>,
    unique: bool,
    null_filtered: bool,
    parent: Option<NodeId>,
    managing_nodes: Vec<NodeId>,
}

impl Updater<'_> {
    pub(super) fn create_index(&mut self, stmt: &CreateIndex) -> Result<()> {
        if stmt.if_not_exists && self.base.find_index(&stmt.name).is_some() {
            return Ok(());
        }
        let table = self.base_table(&stmt.table)?.id;
        let key_columns = self.key_columns(table, &stmt.key)?;
        let stored_columns = self.column_ids(table, &stmt.storing)?;
        let parent = match &stmt.interleave_in {
            Some(parent) => Some(self.base_table(parent)?.id),
            None => None,
        };
        self.add_index(IndexPlan {
            name: stmt.name.clone(),
            table,
            key_columns,
            stored_columns,
            unique: stmt.unique,
            null_filtered: stmt.null_filtered,
            parent,
            managing_nodes: Vec::new(),
        })
        .map(|_| ())
    }

    pub(super) fn drop_index(&mut self, stmt: &DropObject) -> Result<()> {
        let Some(index) = self.base.find_index(&stmt.name) else {
            if stmt.if_exists {
                return Ok(());
            }
            return Err(Error::schema(format!("Index not found: {}", stmt.name)));
        };
        if index.is_managed() {
            let managers: Vec<&str> = index
                .managing_nodes
                .iter()
                .filter_map(|id| self.base.graph().get(*id))
                .map(|node| node.name())
                .collect();
            return Err(Error::schema(format!(
                "Cannot drop managed index {}: it is used by {}.",
                index.name,
                managers.join(", ")
            )));
        }
        self.editor.delete_node(index.id)
    }

    pub(super) fn add_foreign_key(&mut self, table_id: NodeId, def: &ForeignKeyDef) -> Result<NodeId> {
        let table_name = self.table(table_id)?.name.clone();
        let referenced_id = match self.base.find_table(&def.referenced_table) {
            Some(table) => table.id,
            None if def.referenced_table.eq_ignore_ascii_case(&table_name) => table_id,
            None => {
                return Err(Error::schema(format!(
                    "Table not found: {}",
                    def.referenced_table
                )));
            }
        };
        let referencing_columns = self.column_ids(table_id, &def.columns)?;
        let referenced_columns = self.column_ids(referenced_id, &def.referenced_columns)?;
        let referenced_name = self.table(referenced_id)?.name.clone();

        let fk_id = self.editor.allocate_id();
        let (name, generated_name) = match &def.name {
            Some(name) => (name.clone(), false),
            None => {
                let fp = fingerprint(&format!(
                    "{table_name}|{}|{referenced_name}|{}",
                    def.columns.join(","),
                    def.referenced_columns.join(",")
                ));
                let (_, from) = split_schema_name(&table_name);
                let (_, to) = split_schema_name(&referenced_name);
                let name = self.unused_name(|n| {
                    qualify_like(&table_name, format!("FK_{from}_{to}_{fp}_{n}"))
                });
                (name, true)
            }
        };

        let referencing_pk = self.table(table_id)?.primary_key_ids();
        let covered_by_pk = referencing_columns.len() <= referencing_pk.len()
            && same_column_set(&referencing_pk[..referencing_columns.len()], &referencing_columns);
        let referencing_index = if covered_by_pk {
            None
        } else {
            Some(self.managed_index(table_id, &referencing_columns, false, fk_id)?)
        };

        let referenced_pk = self.table(referenced_id)?.primary_key_ids();
        let referenced_index = if same_column_set(&referenced_pk, &referenced_columns) {
            None
        } else {
            Some(self.managed_index(referenced_id, &referenced_columns, true, fk_id)?)
        };

        self.editor.add_node(ForeignKey {
            id: fk_id,
            name,
            generated_name,
            referencing_table: table_id,
            referencing_columns,
            referencing_index,
            referenced_table: referenced_id,
            referenced_columns,
            referenced_index,
            on_delete: def.on_delete,
            enforced: def.enforced,
        });
        self.editor.edit_node::<Table>(table_id, |t| {
            t.foreign_keys.push(fk_id);
            Ok(())
        })?;
        Ok(fk_id)
    }

    // Shares an existing managed index with the same shape, or creates one.
    fn managed_index(
        &mut self,
        table: NodeId,
        columns: &[NodeId],
        unique: bool,
        managing: NodeId,
    ) -> Result<NodeId> {
        let existing = self
            .editor
            .graph()
            .iter_as::<Index>()
            .filter(|i| !self.editor.is_deleted(i.id))
            .find(|i| {
                i.managed
                    && i.table == table
                    && i.unique == unique
                    && !i.null_filtered
                    && i.key_column_ids() == columns
                    && i.key_columns.iter().all(|k| !k.descending)
            })
            .map(|i| i.id);
        if let Some(id) = existing {
            self.editor.edit_node::<Index>(id, |index| {
                index.managing_nodes.push(managing);
                Ok(())
            })?;
            return Ok(id);
        }

        let table_name = self.table(table)?.name.clone();
        let column_names: Vec<String> = columns
            .iter()
            .filter_map(|id| self.editor.get_as::<Column>(*id))
            .map(|c| c.name.clone())
            .collect();
        let id = self.add_index(IndexPlan {
            name: managed_index_name(&table_name, &column_names, unique),
            table,
            key_columns: columns.iter().copied().map(KeyColumn::ascending).collect(),
            stored_columns: Vec::new(),
            unique,
            null_filtered: false,
            parent: None,
            managing_nodes: vec![managing],
        })?;
        Ok(id)
    }

    // Adds the index node, its data table and the data table columns.
    fn add_index(&mut self, plan: IndexPlan) -> Result<NodeId> {
        let table = self.table(plan.table)?.clone();
        let index_id = self.editor.allocate_id();
        let data_table_id = self.editor.allocate_id();

        let mut sources: Vec<KeyColumn> = plan.key_columns.clone();
        for pk in &table.primary_key {
            if !sources.iter().any(|k| k.column == pk.column) {
                sources.push(*pk);
            }
        }
        let mut data_columns = Vec::new();
        let mut data_key = Vec::new();
        let stored = plan.stored_columns.iter().map(|id| KeyColumn::ascending(*id));
        for (position, source) in sources.iter().copied().chain(stored).enumerate() {
            let original = self
                .editor
                .get_as::<Column>(source.column)
                .ok_or_else(|| Error::Internal(format!("index column {} is missing", source.column)))?
                .clone();
            let id = self.editor.allocate_id();
            let mut column = Column::new(id, &original.name, data_table_id, original.data_type);
            column.nullable = original.nullable;
            column.max_length = original.max_length;
            column.source_column = Some(original.id);
            self.editor.add_node(column);
            data_columns.push(id);
            if position < sources.len() {
                data_key.push(KeyColumn { column: id, ..source });
            }
        }

        let mut data_table = Table::new(data_table_id, format!("_index_data_{}", plan.name));
        data_table.columns = data_columns;
        data_table.primary_key = data_key;
        data_table.owner_index = Some(index_id);
        self.editor.add_node(data_table);

        let null_filtered_columns = if plan.null_filtered {
            plan.key_columns.iter().map(|k| k.column).collect()
        } else {
            Vec::new()
        };
        let managed = !plan.managing_nodes.is_empty();
        self.editor.add_node(Index {
            id: index_id,
            name: plan.name,
            table: plan.table,
            data_table: data_table_id,
            key_columns: plan.key_columns,
            stored_columns: plan.stored_columns,
            null_filtered_columns,
            unique: plan.unique,
            null_filtered: plan.null_filtered,
            parent: plan.parent,
            managing_nodes: plan.managing_nodes,
            managed,
        });
        self.editor.edit_node::<Table>(plan.table, |t| {
            t.indexes.push(index_id);
            Ok(())
        })?;
        Ok(index_id)
    }
}
