use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::catalog::Index;
use super::context::{SchemaChangeAction, ValidationContext};
use super::graph::{NodeId, SchemaGraph, name_key};
use super::node::{NodeVariant, SchemaEntity, SchemaNode};

/// Resolves references while the next graph is being assembled.
pub struct CloneContext<'a> {
    graph: &'a SchemaGraph,
    old: &'a SchemaGraph,
}

impl CloneContext<'_> {
    pub fn is_live(&self, id: NodeId) -> bool {
        self.graph.contains(id)
    }

    /// Drops soft references to nodes that no longer exist.
    pub fn retain_live(&self, ids: &mut Vec<NodeId>) {
        ids.retain(|id| self.graph.contains(*id));
    }

    pub fn live(&self, id: Option<NodeId>) -> Option<NodeId> {
        id.filter(|id| self.graph.contains(*id))
    }

    /// Fails when a hard reference of `owner` points at a deleted node.
    pub fn require(&self, owner: &dyn SchemaEntity, id: NodeId) -> Result<()> {
        if self.graph.contains(id) {
            return Ok(());
        }
        match self.old.get(id) {
            Some(target) => Err(Error::schema(format!(
                "Cannot drop {}: it is still referenced by {} `{}`.",
                target.describe(),
                owner.kind(),
                owner.name()
            ))),
            None => Err(Error::schema(format!(
                "{} `{}` refers to an unknown node {id}",
                owner.kind(),
                owner.name()
            ))),
        }
    }

    pub fn require_all(&self, owner: &dyn SchemaEntity, ids: &[NodeId]) -> Result<()> {
        ids.iter().try_for_each(|id| self.require(owner, *id))
    }
}

/// Accumulates node additions, edits and deletions against a base graph and
/// turns them into the next graph in one step.
///
/// Nothing is visible to readers of the base graph; dropping the editor
/// discards the edit.
pub struct SchemaGraphEditor<'a> {
    base: &'a SchemaGraph,
    graph: SchemaGraph,
    added: BTreeSet<NodeId>,
    edited: BTreeSet<NodeId>,
    deleted: BTreeSet<NodeId>,
}

impl<'a> SchemaGraphEditor<'a> {
    pub fn new(base: &'a SchemaGraph) -> Self {
        Self {
            base,
            graph: base.clone(),
            added: BTreeSet::new(),
            edited: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }

    pub fn base(&self) -> &'a SchemaGraph {
        self.base
    }

    /// The working graph, with pending additions and edits applied.
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.graph.next_id);
        self.graph.next_id += 1;
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        if self.deleted.contains(&id) {
            return None;
        }
        self.graph.get(id)
    }

    pub fn get_as<T: NodeVariant>(&self, id: NodeId) -> Option<&T> {
        self.get(id).and_then(T::from_node)
    }

    pub fn is_deleted(&self, id: NodeId) -> bool {
        self.deleted.contains(&id)
    }

    /// Adds a node whose id came from [`allocate_id`](Self::allocate_id).
    pub fn add_node(&mut self, node: impl Into<SchemaNode>) -> NodeId {
        let node = node.into();
        let id = node.id();
        self.graph.nodes.insert(id, Arc::new(node));
        self.added.insert(id);
        id
    }

    /// Replaces node `id` by an edited copy.
    pub fn edit_node<T: NodeVariant>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut T) -> Result<()>,
    ) -> Result<()> {
        if self.deleted.contains(&id) {
            return Err(Error::Internal(format!("edit of deleted node {id}")));
        }
        let shared = self
            .graph
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::Internal(format!("edit of unknown node {id}")))?;
        let node = Arc::make_mut(shared);
        let typed = T::from_node_mut(node)
            .ok_or_else(|| Error::Internal(format!("node {id} has an unexpected kind")))?;
        edit(typed)?;
        if !self.added.contains(&id) {
            self.edited.insert(id);
        }
        Ok(())
    }

    /// Marks `id` for deletion. Owned nodes follow when the edit is built.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        if !self.graph.contains(id) {
            return Err(Error::Internal(format!("delete of unknown node {id}")));
        }
        self.deleted.insert(id);
        Ok(())
    }

    /// Produces the next graph, plus the data work the change requires.
    pub fn build(mut self) -> Result<(SchemaGraph, Vec<SchemaChangeAction>)> {
        self.cascade_deletes();
        for id in &self.deleted {
            self.graph.nodes.remove(id);
        }
        let deleted = std::mem::take(&mut self.deleted);
        self.added.retain(|id| !deleted.contains(id));
        self.edited.retain(|id| !deleted.contains(id));

        let changed: BTreeSet<NodeId> = deleted.iter().chain(self.edited.iter()).copied().collect();
        let dependents: Vec<NodeId> = self
            .graph
            .nodes
            .iter()
            .filter(|(id, _)| !self.added.contains(*id) && !self.edited.contains(*id))
            .filter(|(_, node)| {
                node.entity()
                    .references()
                    .iter()
                    .any(|r| changed.contains(r))
            })
            .map(|(id, _)| *id)
            .collect();
        trace!(
            added = self.added.len(),
            edited = self.edited.len(),
            deleted = deleted.len(),
            dependents = dependents.len(),
            "building schema graph"
        );
        self.edited.extend(dependents);

        let touched: Vec<NodeId> = self.added.iter().chain(self.edited.iter()).copied().collect();
        let snapshot = self.graph.clone();
        let clone_ctx = CloneContext {
            graph: &snapshot,
            old: self.base,
        };
        for id in &touched {
            if let Some(shared) = self.graph.nodes.get_mut(id) {
                Arc::make_mut(shared).entity_mut().deep_clone(&clone_ctx)?;
            }
        }

        let graph = self.graph;
        let mut ctx = ValidationContext::new(&graph, self.base);
        for id in &self.added {
            if let Some(node) = graph.get(*id) {
                node.entity().validate(&mut ctx)?;
            }
        }
        for id in &self.edited {
            let Some(node) = graph.get(*id) else { continue };
            if let Some(old) = self.base.get(*id) {
                node.entity().validate_update(old, &mut ctx)?;
            }
            node.entity().validate(&mut ctx)?;
        }
        for id in &deleted {
            if let Some(table) = self.base.get(*id).and_then(SchemaNode::as_table) {
                ctx.add_action(SchemaChangeAction::DropTableData { table: table.id });
            }
            if let Some(column) = self.base.get(*id).and_then(SchemaNode::as_column) {
                if graph.contains(column.table) {
                    ctx.add_action(SchemaChangeAction::DropColumnData {
                        table: column.table,
                        column: column.id,
                    });
                }
            }
            if let Some(seq) = self.base.get(*id).and_then(SchemaNode::as_sequence) {
                ctx.add_action(SchemaChangeAction::ForgetSequence { sequence: seq.id });
            }
        }
        let actions = ctx.into_actions();

        let mut graph = graph;
        update_names(&mut graph, self.base, &deleted, &self.edited, &self.added)?;
        debug!(nodes = graph.len(), actions = actions.len(), "schema graph built");
        Ok((graph, actions))
    }

    // Follows ownership and drops managed indexes whose last managing node
    // is gone, until nothing changes.
    fn cascade_deletes(&mut self) {
        let mut work: Vec<NodeId> = self.deleted.iter().copied().collect();
        loop {
            while let Some(id) = work.pop() {
                let Some(node) = self.graph.get(id) else { continue };
                for owned in node.entity().owned() {
                    if self.deleted.insert(owned) {
                        work.push(owned);
                    }
                }
            }
            let orphans: Vec<NodeId> = self
                .graph
                .iter_as::<Index>()
                .filter(|index| index.managed && !self.deleted.contains(&index.id))
                .filter(|index| index.managing_nodes.iter().all(|m| self.deleted.contains(m)))
                .map(|index| index.id)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                self.deleted.insert(id);
                work.push(id);
            }
        }
    }
}

fn update_names(
    graph: &mut SchemaGraph,
    base: &SchemaGraph,
    deleted: &BTreeSet<NodeId>,
    edited: &BTreeSet<NodeId>,
    added: &BTreeSet<NodeId>,
) -> Result<()> {
    for id in deleted.iter().chain(edited.iter()) {
        let Some(old) = base.get(*id) else { continue };
        for info in old.entity().name_info() {
            let key = name_key(info.scope, &info.name);
            if graph.names.get(&key) == Some(id) {
                graph.names.remove(&key);
            }
        }
    }
    for id in added.iter().chain(edited.iter()) {
        let Some(node) = graph.get(*id) else { continue };
        let infos = node.entity().name_info();
        for info in infos {
            let key = name_key(info.scope, &info.name);
            match graph.names.get(&key) {
                Some(existing) if existing != id => {
                    return Err(Error::schema(format!(
                        "Duplicate name in schema: {}.",
                        info.name
                    )));
                }
                _ => {
                    graph.names.insert(key, *id);
                }
            }
        }
    }
    Ok(())
}
