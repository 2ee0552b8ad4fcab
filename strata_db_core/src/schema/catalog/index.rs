use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::schema::context::{SchemaChangeAction, ValidationContext};
use crate::schema::editor::CloneContext;
use crate::schema::graph::{NodeId, SchemaGraph};
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NodeKind, SchemaEntity, SchemaNode};

use super::named_schema::require_named_schema;
use super::{Column, KeyColumn, Table};

/// A secondary index. Its rows live in a non-public data table whose
/// primary key is the index key followed by the remaining primary key
/// columns of the indexed table.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub id: NodeId,
    pub name: String,
    pub table: NodeId,
    pub data_table: NodeId,
    /// Columns of the indexed table.
    pub key_columns: Vec<KeyColumn>,
    pub stored_columns: Vec<NodeId>,
    pub null_filtered_columns: Vec<NodeId>,
    pub unique: bool,
    pub null_filtered: bool,
    /// Table the index is interleaved in.
    pub parent: Option<NodeId>,
    /// Nodes (foreign keys) that keep a managed index alive.
    pub managing_nodes: Vec<NodeId>,
    pub managed: bool,
}

impl Index {
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    pub fn key_column_ids(&self) -> Vec<NodeId> {
        self.key_columns.iter().map(|k| k.column).collect()
    }

    /// The data table column that mirrors `source` of the indexed table.
    pub fn data_column_for<'g>(&self, graph: &'g SchemaGraph, source: NodeId) -> Option<&'g Column> {
        let data_table = graph.get_as::<Table>(self.data_table)?;
        data_table
            .columns
            .iter()
            .filter_map(|id| graph.get_as::<Column>(*id))
            .find(|c| c.source_column == Some(source))
    }

    /// Primary key the data table must have: index keys, then indexed
    /// table key columns that are not index keys.
    pub fn expected_data_key(&self, table: &Table) -> Vec<KeyColumn> {
        let mut key = self.key_columns.clone();
        for pk in &table.primary_key {
            if !key.iter().any(|k| k.column == pk.column) {
                key.push(*pk);
            }
        }
        key
    }

    fn check_data_table(&self, graph: &SchemaGraph, table: &Table) -> Result<()> {
        let data_table = graph.get_as::<Table>(self.data_table).ok_or_else(|| {
            Error::Internal(format!("index {} has no data table", self.name))
        })?;
        if data_table.owner_index != Some(self.id) {
            return Err(Error::Internal(format!(
                "data table of index {} is owned by another node",
                self.name
            )));
        }
        let expected: Vec<(Option<NodeId>, bool)> = self
            .expected_data_key(table)
            .iter()
            .map(|k| {
                (
                    self.data_column_for(graph, k.column).map(|c| c.id),
                    k.descending,
                )
            })
            .collect();
        let actual: Vec<(Option<NodeId>, bool)> = data_table
            .primary_key
            .iter()
            .map(|k| (Some(k.column), k.descending))
            .collect();
        if expected != actual {
            return Err(Error::Internal(format!(
                "data table key of index {} does not match the index key",
                self.name
            )));
        }
        Ok(())
    }

    fn check_interleave(&self, graph: &SchemaGraph, table: &Table, parent: &Table) -> Result<()> {
        let mut ancestor = Some(table.id);
        let mut found = false;
        while let Some(id) = ancestor {
            if id == parent.id {
                found = true;
                break;
            }
            ancestor = graph.get_as::<Table>(id).and_then(|t| t.parent);
        }
        if !found {
            return Err(Error::schema(format!(
                "Cannot interleave index {} of table {} within table {} because {} is not an ancestor of {}.",
                self.name, table.name, parent.name, parent.name, table.name
            )));
        }
        for (i, parent_key) in parent.primary_key.iter().enumerate() {
            let parent_col = graph.get_as::<Column>(parent_key.column);
            let key_col = self
                .key_columns
                .get(i)
                .and_then(|k| graph.get_as::<Column>(k.column));
            let matches = match (parent_col, key_col) {
                (Some(p), Some(k)) => p.name.eq_ignore_ascii_case(&k.name) && p.data_type == k.data_type,
                _ => false,
            };
            if !matches {
                return Err(Error::schema(format!(
                    "Index {} does not specify all the key columns of its interleave parent {} as a prefix.",
                    self.name, parent.name
                )));
            }
        }
        Ok(())
    }
}

impl SchemaEntity for Index {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Index
    }

    fn references(&self) -> Vec<NodeId> {
        let mut refs = vec![self.table, self.data_table];
        refs.extend(self.key_columns.iter().map(|k| k.column));
        refs.extend(self.stored_columns.iter().copied());
        refs.extend(self.null_filtered_columns.iter().copied());
        refs.extend(self.parent);
        refs.extend(self.managing_nodes.iter().copied());
        refs
    }

    fn owned(&self) -> Vec<NodeId> {
        vec![self.data_table]
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require(&*self, self.table)?;
        ctx.require(&*self, self.data_table)?;
        for key in &self.key_columns {
            ctx.require(&*self, key.column)?;
        }
        ctx.require_all(&*self, &self.stored_columns)?;
        ctx.require_all(&*self, &self.null_filtered_columns)?;
        if let Some(parent) = self.parent {
            ctx.require(&*self, parent)?;
        }
        ctx.retain_live(&mut self.managing_nodes);
        Ok(())
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        let graph = ctx.graph();
        validate_schema_name("Index", &self.name)?;
        require_named_schema(graph, &self.name)?;

        let table: &Table = ctx.require(self.table, "Index")?;
        if !table.is_public() {
            return Err(Error::schema(format!(
                "Cannot create index {} on an index data table.",
                self.name
            )));
        }
        if !table.indexes.contains(&self.id) {
            return Err(Error::Internal(format!(
                "index {} is not listed by table {}",
                self.name, table.name
            )));
        }
        if self.key_columns.is_empty() {
            return Err(Error::schema(format!(
                "Index {} must have at least one key column.",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for key in &self.key_columns {
            let column: &Column = ctx.require(key.column, "Index key")?;
            if column.table != table.id {
                return Err(Error::schema(format!(
                    "Index {} key column {} is not a column of table {}.",
                    self.name, column.name, table.name
                )));
            }
            if !seen.insert(key.column) {
                return Err(Error::schema(format!(
                    "Index {} specifies key column {} twice.",
                    self.name, column.name
                )));
            }
            if !column.data_type.is_keyable() {
                return Err(Error::schema(format!(
                    "Index {} is defined on a column of unsupported type {}.",
                    self.name, column.data_type
                )));
            }
        }
        for stored in &self.stored_columns {
            let column: &Column = ctx.require(*stored, "Index stored column")?;
            if column.table != table.id {
                return Err(Error::schema(format!(
                    "Index {} stores column {} which is not a column of table {}.",
                    self.name, column.name, table.name
                )));
            }
            if seen.contains(stored) {
                return Err(Error::schema(format!(
                    "Cannot use index key column {} as a STORING column in index {}.",
                    column.name, self.name
                )));
            }
            if table.is_key_column(*stored) {
                return Err(Error::schema(format!(
                    "Cannot use column {} in STORING clause of index {} as it is a primary key column.",
                    column.name, self.name
                )));
            }
            seen.insert(*stored);
        }
        for column in &self.null_filtered_columns {
            if !self.key_columns.iter().any(|k| k.column == *column) {
                return Err(Error::Internal(format!(
                    "null filtered column of index {} is not a key column",
                    self.name
                )));
            }
        }

        if let Some(parent_id) = self.parent {
            let parent: &Table = ctx.require(parent_id, "Interleaved index")?;
            self.check_interleave(graph, table, parent)?;
        }

        self.check_data_table(graph, table)?;

        if self.managed && self.managing_nodes.is_empty() {
            return Err(Error::Internal(format!(
                "managed index {} has no managing nodes",
                self.name
            )));
        }

        if !ctx.existed_before(self.id) && ctx.existed_before(self.table) {
            ctx.add_action(SchemaChangeAction::BackfillIndex { index: self.id });
        }
        Ok(())
    }

    fn validate_update(&self, old: &SchemaNode, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        let Some(old) = old.as_index() else {
            return Err(Error::Internal("index replaced by another kind".to_string()));
        };
        if old.key_columns != self.key_columns
            || old.unique != self.unique
            || old.null_filtered != self.null_filtered
            || old.table != self.table
        {
            return Err(Error::schema(format!(
                "Cannot change the key structure of index {}.",
                self.name
            )));
        }
        Ok(())
    }
}
