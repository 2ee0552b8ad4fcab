use crate::error::{Error, Result};

use super::graph::{NodeId, SchemaGraph};
use super::node::{NodeVariant, SchemaNode};

/// Work that has to run against existing data before a schema version can
/// be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChangeAction {
    VerifyNotNull { table: NodeId, column: NodeId },
    VerifyMaxLength { table: NodeId, column: NodeId, max_length: i64 },
    VerifyCheckConstraint { table: NodeId, check: NodeId },
    VerifyForeignKey { foreign_key: NodeId },
    /// Populates a new index and verifies uniqueness when required.
    BackfillIndex { index: NodeId },
    /// Computes a new default or stored generated column for existing rows.
    BackfillColumn { table: NodeId, column: NodeId },
    /// Removes the cells of a dropped column.
    DropColumnData { table: NodeId, column: NodeId },
    DropTableData { table: NodeId },
    RestartSequence { sequence: NodeId, counter: i64 },
    ForgetSequence { sequence: NodeId },
}

/// State handed to `validate` and `validate_update`.
pub struct ValidationContext<'a> {
    new: &'a SchemaGraph,
    old: &'a SchemaGraph,
    actions: Vec<SchemaChangeAction>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(new: &'a SchemaGraph, old: &'a SchemaGraph) -> Self {
        Self {
            new,
            old,
            actions: Vec::new(),
        }
    }

    /// The graph being built.
    pub fn graph(&self) -> &'a SchemaGraph {
        self.new
    }

    /// The graph the edit started from.
    pub fn old_graph(&self) -> &'a SchemaGraph {
        self.old
    }

    /// Whether the node already existed before this edit.
    pub fn existed_before(&self, id: NodeId) -> bool {
        self.old.contains(id)
    }

    pub fn add_action(&mut self, action: SchemaChangeAction) {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }

    pub fn into_actions(self) -> Vec<SchemaChangeAction> {
        self.actions
    }

    /// Resolves `id` in the new graph as a `T`, failing with a schema error.
    pub fn require<T: NodeVariant>(&self, id: NodeId, what: &str) -> Result<&'a T> {
        self.new
            .get_as::<T>(id)
            .ok_or_else(|| Error::schema(format!("{what} refers to a missing node {id}")))
    }

    pub fn node(&self, id: NodeId) -> Option<&'a SchemaNode> {
        self.new.get(id)
    }
}
