use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::{NodeId, SchemaGraph};
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity, SchemaNode};
use crate::types::datatype::DataType;

use super::named_schema::require_named_schema;
use super::{Column, KeyColumn, LocalityGroup, OnDeleteAction, RowDeletionPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub id: NodeId,
    pub name: String,
    pub columns: Vec<NodeId>,
    pub primary_key: Vec<KeyColumn>,
    /// Interleave parent.
    pub parent: Option<NodeId>,
    pub on_delete: OnDeleteAction,
    pub indexes: Vec<NodeId>,
    /// Foreign keys declared on (referencing from) this table.
    pub foreign_keys: Vec<NodeId>,
    pub check_constraints: Vec<NodeId>,
    pub synonym: Option<String>,
    pub row_deletion_policy: Option<RowDeletionPolicy>,
    pub locality_group: Option<NodeId>,
    /// Set for the data table of an index; such tables are not public.
    pub owner_index: Option<NodeId>,
}

impl Table {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            parent: None,
            on_delete: OnDeleteAction::NoAction,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
            synonym: None,
            row_deletion_policy: None,
            locality_group: None,
            owner_index: None,
        }
    }

    pub fn is_public(&self) -> bool {
        self.owner_index.is_none()
    }

    pub fn primary_key_ids(&self) -> Vec<NodeId> {
        self.primary_key.iter().map(|k| k.column).collect()
    }

    pub fn is_key_column(&self, column: NodeId) -> bool {
        self.primary_key.iter().any(|k| k.column == column)
    }

    /// Resolves a column of this table by name, case-insensitively.
    pub fn find_column<'g>(&self, graph: &'g SchemaGraph, name: &str) -> Option<&'g Column> {
        self.columns
            .iter()
            .filter_map(|id| graph.get_as::<Column>(*id))
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_list<'g>(&self, graph: &'g SchemaGraph) -> Vec<&'g Column> {
        self.columns
            .iter()
            .filter_map(|id| graph.get_as::<Column>(*id))
            .collect()
    }

    fn check_primary_key(&self, graph: &SchemaGraph) -> Result<()> {
        let mut seen = HashSet::new();
        for key in &self.primary_key {
            let column = graph.get_as::<Column>(key.column).ok_or_else(|| {
                Error::schema(format!(
                    "Table {} has a primary key column that does not exist.",
                    self.name
                ))
            })?;
            if column.table != self.id {
                return Err(Error::schema(format!(
                    "Primary key column {} does not belong to table {}.",
                    column.name, self.name
                )));
            }
            if !seen.insert(key.column) {
                return Err(Error::schema(format!(
                    "Table {} references column {} more than once in its primary key.",
                    self.name, column.name
                )));
            }
            if !column.data_type.is_keyable() {
                return Err(Error::schema(format!(
                    "Column {}.{} has type {}, but is part of the primary key.",
                    self.name, column.name, column.data_type
                )));
            }
            if column.generated.as_ref().map(|g| !g.stored).unwrap_or(false) {
                return Err(Error::schema(format!(
                    "Generated column {}.{} must be STORED to be part of the primary key.",
                    self.name, column.name
                )));
            }
        }
        Ok(())
    }

    fn check_parent(&self, graph: &SchemaGraph, parent: &Table) -> Result<()> {
        if !parent.is_public() {
            return Err(Error::schema(format!(
                "Table {} cannot be interleaved in {}.",
                self.name, parent.name
            )));
        }
        if let Some(missing) = parent.primary_key.get(self.primary_key.len()) {
            let name = graph
                .get_as::<Column>(missing.column)
                .map(|c| c.name.as_str())
                .unwrap_or_default();
            return Err(Error::schema(format!(
                "Table {} does not reference parent key column {}.",
                self.name, name
            )));
        }
        for (parent_key, child_key) in parent.primary_key.iter().zip(&self.primary_key) {
            let parent_col = graph.get_as::<Column>(parent_key.column);
            let child_col = graph.get_as::<Column>(child_key.column);
            let (Some(parent_col), Some(child_col)) = (parent_col, child_col) else {
                return Err(Error::Internal(format!(
                    "missing key column while checking interleave of {}",
                    self.name
                )));
            };
            if !parent_col.name.eq_ignore_ascii_case(&child_col.name) {
                return Err(Error::schema(format!(
                    "Table {} does not reference parent key column {}.",
                    self.name, parent_col.name
                )));
            }
            if parent_col.data_type != child_col.data_type {
                return Err(Error::schema(format!(
                    "The column type of {}.{} does not match the type of parent key column {}.{}.",
                    self.name, child_col.name, parent.name, parent_col.name
                )));
            }
        }
        let mut ancestor = parent.parent;
        while let Some(id) = ancestor {
            if id == self.id {
                return Err(Error::schema(format!(
                    "Table {} cannot be interleaved in its own descendant.",
                    self.name
                )));
            }
            ancestor = graph.get_as::<Table>(id).and_then(|t| t.parent);
        }
        Ok(())
    }

    fn check_generated_columns(&self, graph: &SchemaGraph) -> Result<()> {
        let columns = self.column_list(graph);
        let deps: BTreeMap<String, BTreeSet<String>> = columns
            .iter()
            .filter_map(|c| {
                c.generated.as_ref().map(|g| {
                    (c.name.to_lowercase(), g.expression.referenced_columns())
                })
            })
            .collect();
        let known: BTreeSet<String> = columns.iter().map(|c| c.name.to_lowercase()).collect();
        for (column, referenced) in &deps {
            if let Some(missing) = referenced.iter().find(|r| !known.contains(*r)) {
                return Err(Error::schema(format!(
                    "Generated column {}.{} references unknown column {}.",
                    self.name, column, missing
                )));
            }
        }
        let mut done = BTreeSet::new();
        for start in deps.keys() {
            let mut visiting = BTreeSet::new();
            visit_generated(start, &deps, &mut visiting, &mut done).map_err(|cycle| {
                Error::schema(format!(
                    "Cycle detected while analyzing generated column {}.{}.",
                    self.name, cycle
                ))
            })?;
        }
        Ok(())
    }
}

fn visit_generated(
    name: &str,
    deps: &BTreeMap<String, BTreeSet<String>>,
    visiting: &mut BTreeSet<String>,
    done: &mut BTreeSet<String>,
) -> std::result::Result<(), String> {
    if done.contains(name) {
        return Ok(());
    }
    if !visiting.insert(name.to_string()) {
        return Err(name.to_string());
    }
    if let Some(next) = deps.get(name) {
        for dep in next {
            visit_generated(dep, deps, visiting, done)?;
        }
    }
    visiting.remove(name);
    done.insert(name.to_string());
    Ok(())
}

impl SchemaEntity for Table {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Table
    }

    fn name_info(&self) -> Vec<NameInfo> {
        if !self.is_public() {
            return Vec::new();
        }
        let mut names = vec![NameInfo::global(&self.name)];
        names.extend(self.synonym.iter().map(NameInfo::global));
        names
    }

    fn references(&self) -> Vec<NodeId> {
        let mut refs = self.columns.clone();
        refs.extend(self.parent);
        refs.extend(self.indexes.iter().copied());
        refs.extend(self.foreign_keys.iter().copied());
        refs.extend(self.check_constraints.iter().copied());
        refs.extend(self.locality_group);
        refs.extend(self.owner_index);
        refs
    }

    fn owned(&self) -> Vec<NodeId> {
        let mut owned = self.columns.clone();
        owned.extend(self.indexes.iter().copied());
        owned.extend(self.foreign_keys.iter().copied());
        owned.extend(self.check_constraints.iter().copied());
        owned
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.retain_live(&mut self.columns);
        ctx.retain_live(&mut self.indexes);
        ctx.retain_live(&mut self.foreign_keys);
        ctx.retain_live(&mut self.check_constraints);
        if let Some(parent) = self.parent {
            ctx.require(&*self, parent)?;
        }
        if let Some(group) = self.locality_group {
            ctx.require(&*self, group)?;
        }
        if let Some(index) = self.owner_index {
            ctx.require(&*self, index)?;
        }
        for key in &self.primary_key {
            if !ctx.is_live(key.column) {
                return Err(Error::schema(format!(
                    "Cannot drop key column of table `{}`.",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        let graph = ctx.graph();
        if self.is_public() {
            validate_schema_name("Table", &self.name)?;
            require_named_schema(graph, &self.name)?;
        }
        if let Some(synonym) = &self.synonym {
            validate_schema_name("Synonym", synonym)?;
        }

        let mut names = HashSet::new();
        for column in self.column_list(graph) {
            if !names.insert(column.name.to_lowercase()) {
                return Err(Error::schema(format!(
                    "Duplicate column name {}.{}.",
                    self.name, column.name
                )));
            }
        }
        if self.column_list(graph).len() != self.columns.len() {
            return Err(Error::Internal(format!(
                "table {} lists a column that is not a column",
                self.name
            )));
        }

        self.check_primary_key(graph)?;
        self.check_generated_columns(graph)?;

        if let Some(parent_id) = self.parent {
            let parent: &Table = ctx.require(parent_id, "Interleaved table")?;
            self.check_parent(graph, parent)?;
        } else if self.on_delete == OnDeleteAction::Cascade {
            return Err(Error::schema(format!(
                "Table {} is not interleaved; ON DELETE CASCADE requires a parent.",
                self.name
            )));
        }

        if let Some(policy) = &self.row_deletion_policy {
            let column = self.find_column(graph, &policy.column).ok_or_else(|| {
                Error::schema(format!(
                    "Cannot create a row deletion policy on table {}: column {} does not exist.",
                    self.name, policy.column
                ))
            })?;
            if column.data_type != DataType::Timestamp {
                return Err(Error::schema(format!(
                    "Row deletion policy column {}.{} must be of type TIMESTAMP.",
                    self.name, column.name
                )));
            }
            if policy.older_than_days < 0 {
                return Err(Error::schema(format!(
                    "Row deletion policy of table {} must have a non-negative interval.",
                    self.name
                )));
            }
        }

        if let Some(group) = self.locality_group {
            ctx.require::<LocalityGroup>(group, "Table locality group")?;
        }

        let placement_keys = self
            .column_list(graph)
            .into_iter()
            .filter(|c| c.placement_key)
            .count();
        if placement_keys > 1 {
            return Err(Error::schema(format!(
                "Table {} can have at most one placement key column.",
                self.name
            )));
        }
        Ok(())
    }

    fn validate_update(&self, old: &SchemaNode, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        let Some(old) = old.as_table() else {
            return Err(Error::Internal("table replaced by another kind".to_string()));
        };
        if old.primary_key != self.primary_key {
            return Err(Error::schema(format!(
                "Cannot change the primary key of table {}.",
                self.name
            )));
        }
        if old.parent != self.parent {
            return Err(Error::schema(format!(
                "Cannot change the interleaving parent of table {}.",
                self.name
            )));
        }
        Ok(())
    }
}
