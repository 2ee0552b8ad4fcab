use std::fmt;

use crate::error::Result;

use super::catalog::{
    ChangeStream, CheckConstraint, Column, DatabaseOptions, ForeignKey, Index, LocalityGroup,
    Model, NamedSchema, Placement, PropertyGraph, Sequence, Table, Udf, View,
};
use super::context::ValidationContext;
use super::editor::CloneContext;
use super::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Table,
    Column,
    Index,
    ForeignKey,
    CheckConstraint,
    Sequence,
    View,
    Udf,
    ChangeStream,
    Model,
    LocalityGroup,
    Placement,
    NamedSchema,
    PropertyGraph,
    DatabaseOptions,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Table => "Table",
            NodeKind::Column => "Column",
            NodeKind::Index => "Index",
            NodeKind::ForeignKey => "Foreign Key",
            NodeKind::CheckConstraint => "Check Constraint",
            NodeKind::Sequence => "Sequence",
            NodeKind::View => "View",
            NodeKind::Udf => "Function",
            NodeKind::ChangeStream => "Change Stream",
            NodeKind::Model => "Model",
            NodeKind::LocalityGroup => "Locality Group",
            NodeKind::Placement => "Placement",
            NodeKind::NamedSchema => "Schema",
            NodeKind::PropertyGraph => "Property Graph",
            NodeKind::DatabaseOptions => "Database",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope shared by tables, synonyms, indexes, views, functions, sequences,
/// change streams, models, property graphs and constraint names.
pub const GLOBAL_SCOPE: &str = "global";

/// A name a node occupies within a name scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    pub scope: &'static str,
    pub name: String,
}

impl NameInfo {
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            scope: GLOBAL_SCOPE,
            name: name.into(),
        }
    }

    pub fn scoped(scope: &'static str, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }
}

/// Behavior shared by every schema entity.
pub trait SchemaEntity {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// Names this node reserves. Defaults to its own name in the global scope.
    fn name_info(&self) -> Vec<NameInfo> {
        vec![NameInfo::global(self.name())]
    }

    /// Every node this node points at.
    fn references(&self) -> Vec<NodeId>;

    /// Nodes that are deleted together with this one.
    fn owned(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// Re-resolves references against the graph being built. Soft
    /// references to deleted nodes are dropped; hard references fail.
    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()>;

    /// Entity-local invariants, checked for every added or changed node.
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()>;

    /// Checks that replacing `old` with `self` is allowed.
    fn validate_update(&self, _old: &SchemaNode, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Typed access to one variant of [`SchemaNode`].
pub trait NodeVariant: Sized + 'static {
    fn from_node(node: &SchemaNode) -> Option<&Self>;
    fn from_node_mut(node: &mut SchemaNode) -> Option<&mut Self>;
    fn into_node(self) -> SchemaNode;
}

macro_rules! schema_nodes {
    ($($variant:ident => $accessor:ident;)*) => {
        /// One schema entity.
        #[derive(Debug, Clone, PartialEq)]
        pub enum SchemaNode {
            $($variant($variant),)*
        }

        impl SchemaNode {
            pub fn entity(&self) -> &dyn SchemaEntity {
                match self {
                    $(SchemaNode::$variant(node) => node as &dyn SchemaEntity,)*
                }
            }

            pub fn entity_mut(&mut self) -> &mut dyn SchemaEntity {
                match self {
                    $(SchemaNode::$variant(node) => node as &mut dyn SchemaEntity,)*
                }
            }

            $(
                pub fn $accessor(&self) -> Option<&$variant> {
                    $variant::from_node(self)
                }
            )*
        }

        $(
            impl NodeVariant for $variant {
                fn from_node(node: &SchemaNode) -> Option<&Self> {
                    match node {
                        SchemaNode::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_node_mut(node: &mut SchemaNode) -> Option<&mut Self> {
                    match node {
                        SchemaNode::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn into_node(self) -> SchemaNode {
                    SchemaNode::$variant(self)
                }
            }

            impl From<$variant> for SchemaNode {
                fn from(node: $variant) -> Self {
                    SchemaNode::$variant(node)
                }
            }
        )*
    };
}

schema_nodes! {
    Table => as_table;
    Column => as_column;
    Index => as_index;
    ForeignKey => as_foreign_key;
    CheckConstraint => as_check_constraint;
    Sequence => as_sequence;
    View => as_view;
    Udf => as_udf;
    ChangeStream => as_change_stream;
    Model => as_model;
    LocalityGroup => as_locality_group;
    Placement => as_placement;
    NamedSchema => as_named_schema;
    PropertyGraph => as_property_graph;
    DatabaseOptions => as_database_options;
}

impl SchemaNode {
    pub fn id(&self) -> NodeId {
        self.entity().id()
    }

    pub fn name(&self) -> &str {
        self.entity().name()
    }

    pub fn kind(&self) -> NodeKind {
        self.entity().kind()
    }

    /// `Table \`Users\``, as used in error messages.
    pub fn describe(&self) -> String {
        format!("{} `{}`", self.kind(), self.name())
    }
}
