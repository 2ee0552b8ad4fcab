use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::schema::context::{SchemaChangeAction, ValidationContext};
use crate::schema::editor::CloneContext;
use crate::schema::graph::{NodeId, SchemaGraph};
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NodeKind, SchemaEntity, SchemaNode};

use super::{Column, Index, OnDeleteAction, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub id: NodeId,
    /// Effective name: the user constraint name or a generated one.
    pub name: String,
    pub generated_name: bool,
    pub referencing_table: NodeId,
    pub referencing_columns: Vec<NodeId>,
    /// Managed index backing the referencing side, unless the referencing
    /// columns are a prefix of the primary key.
    pub referencing_index: Option<NodeId>,
    pub referenced_table: NodeId,
    pub referenced_columns: Vec<NodeId>,
    /// Managed unique index on the referenced side, unless the referenced
    /// columns are exactly the primary key.
    pub referenced_index: Option<NodeId>,
    pub on_delete: OnDeleteAction,
    pub enforced: bool,
}

impl ForeignKey {
    /// Columns whose values identify the referenced row: either the
    /// referenced table's key or the referenced index's key.
    pub fn referenced_columns_are_primary_key(&self, graph: &SchemaGraph) -> bool {
        graph
            .get_as::<Table>(self.referenced_table)
            .map(|t| same_column_set(&t.primary_key_ids(), &self.referenced_columns))
            .unwrap_or(false)
    }
}

/// Whether `a` and `b` name the same columns, in any order.
pub fn same_column_set(a: &[NodeId], b: &[NodeId]) -> bool {
    a.len() == b.len() && a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>()
}

fn check_columns(
    graph: &SchemaGraph,
    fk: &str,
    table: &Table,
    columns: &[NodeId],
) -> Result<Vec<Column>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in columns {
        let column = graph.get_as::<Column>(*id).ok_or_else(|| {
            Error::Internal(format!("foreign key {fk} refers to a missing column"))
        })?;
        if column.table != table.id {
            return Err(Error::schema(format!(
                "Foreign key {fk}: column {} is not a column of table {}.",
                column.name, table.name
            )));
        }
        if !seen.insert(*id) {
            return Err(Error::schema(format!(
                "Foreign key {fk} specifies column {} more than once.",
                column.name
            )));
        }
        if !column.data_type.is_keyable() {
            return Err(Error::schema(format!(
                "Foreign key {fk} uses column {}.{} of unsupported type {}.",
                table.name, column.name, column.data_type
            )));
        }
        out.push(column.clone());
    }
    Ok(out)
}

impl SchemaEntity for ForeignKey {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::ForeignKey
    }

    fn references(&self) -> Vec<NodeId> {
        let mut refs = vec![self.referencing_table, self.referenced_table];
        refs.extend(self.referencing_columns.iter().copied());
        refs.extend(self.referenced_columns.iter().copied());
        refs.extend(self.referencing_index);
        refs.extend(self.referenced_index);
        refs
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require(&*self, self.referencing_table)?;
        ctx.require(&*self, self.referenced_table)?;
        ctx.require_all(&*self, &self.referencing_columns)?;
        ctx.require_all(&*self, &self.referenced_columns)?;
        if let Some(index) = self.referencing_index {
            ctx.require(&*self, index)?;
        }
        if let Some(index) = self.referenced_index {
            ctx.require(&*self, index)?;
        }
        Ok(())
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        let graph = ctx.graph();
        validate_schema_name("Foreign Key", &self.name)?;
        let referencing: &Table = ctx.require(self.referencing_table, "Foreign key")?;
        let referenced: &Table = ctx.require(self.referenced_table, "Foreign key")?;
        if !referencing.foreign_keys.contains(&self.id) {
            return Err(Error::Internal(format!(
                "foreign key {} is not listed by table {}",
                self.name, referencing.name
            )));
        }
        if !referencing.is_public() || !referenced.is_public() {
            return Err(Error::schema(format!(
                "Foreign key {} cannot reference an index data table.",
                self.name
            )));
        }
        if self.referencing_columns.is_empty() {
            return Err(Error::schema(format!(
                "Foreign key {} must have at least one column.",
                self.name
            )));
        }
        if self.referencing_columns.len() != self.referenced_columns.len() {
            return Err(Error::schema(format!(
                "Foreign key {} has {} referencing columns but {} referenced columns.",
                self.name,
                self.referencing_columns.len(),
                self.referenced_columns.len()
            )));
        }

        let from = check_columns(graph, &self.name, referencing, &self.referencing_columns)?;
        let to = check_columns(graph, &self.name, referenced, &self.referenced_columns)?;
        for (a, b) in from.iter().zip(&to) {
            if a.data_type != b.data_type {
                return Err(Error::schema(format!(
                    "Foreign key {}: the type of {}.{} ({}) does not match the type of {}.{} ({}).",
                    self.name,
                    referencing.name,
                    a.name,
                    a.data_type,
                    referenced.name,
                    b.name,
                    b.data_type
                )));
            }
        }

        match self.referenced_index {
            Some(index_id) => {
                let index: &Index = ctx.require(index_id, "Foreign key")?;
                if !index.unique || !same_column_set(&index.key_column_ids(), &self.referenced_columns) {
                    return Err(Error::Internal(format!(
                        "referenced index of foreign key {} does not cover its columns",
                        self.name
                    )));
                }
            }
            None if !self.referenced_columns_are_primary_key(graph) => {
                return Err(Error::Internal(format!(
                    "foreign key {} has no unique backing on the referenced side",
                    self.name
                )));
            }
            None => {}
        }
        if let Some(index_id) = self.referencing_index {
            ctx.require::<Index>(index_id, "Foreign key")?;
        }

        let is_new = !ctx.existed_before(self.id);
        let tables_existed =
            ctx.existed_before(self.referencing_table) && ctx.existed_before(self.referenced_table);
        if is_new && tables_existed && self.enforced {
            ctx.add_action(SchemaChangeAction::VerifyForeignKey { foreign_key: self.id });
        }
        Ok(())
    }

    fn validate_update(&self, old: &SchemaNode, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        let Some(old) = old.as_foreign_key() else {
            return Err(Error::Internal("foreign key replaced by another kind".to_string()));
        };
        if old.referencing_columns != self.referencing_columns
            || old.referenced_columns != self.referenced_columns
        {
            return Err(Error::schema(format!(
                "Cannot change the columns of foreign key {}.",
                self.name
            )));
        }
        Ok(())
    }
}
