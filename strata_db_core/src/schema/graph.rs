use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::node::{NodeVariant, SchemaNode};

/// Identity of a schema node. Allocated once and kept by every later
/// version of the node, so ids double as creation order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The node set of one schema version.
///
/// Both maps are persistent: producing the next version copies only the
/// paths to changed entries, and every untouched node is the same `Arc` in
/// both versions.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub(super) nodes: im::OrdMap<NodeId, Arc<SchemaNode>>,
    pub(super) names: im::HashMap<String, NodeId>,
    pub(super) next_id: u64,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(&id).map(|node| node.as_ref())
    }

    /// The shared node instance, for identity comparisons across versions.
    pub fn get_shared(&self, id: NodeId) -> Option<&Arc<SchemaNode>> {
        self.nodes.get(&id)
    }

    pub fn get_as<T: NodeVariant>(&self, id: NodeId) -> Option<&T> {
        self.get(id).and_then(T::from_node)
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaNode> + '_ {
        self.nodes.values().map(|node| node.as_ref())
    }

    pub fn iter_as<T: NodeVariant>(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().filter_map(T::from_node)
    }

    /// Looks up a node in a name scope, case-insensitively.
    pub fn find_name(&self, scope: &str, name: &str) -> Option<NodeId> {
        self.names.get(&name_key(scope, name)).copied()
    }
}

pub(super) fn name_key(scope: &str, name: &str) -> String {
    format!("{scope}:{}", name.to_lowercase())
}
