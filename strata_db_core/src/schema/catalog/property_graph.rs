use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NodeKind, SchemaEntity};

use super::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyGraph {
    pub id: NodeId,
    pub name: String,
    pub node_tables: Vec<NodeId>,
    pub edge_tables: Vec<NodeId>,
    /// Original DDL text of the graph definition.
    pub ddl_body: String,
}

impl SchemaEntity for PropertyGraph {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::PropertyGraph
    }

    fn references(&self) -> Vec<NodeId> {
        self.node_tables
            .iter()
            .chain(self.edge_tables.iter())
            .copied()
            .collect()
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require_all(&*self, &self.node_tables)?;
        ctx.require_all(&*self, &self.edge_tables)
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_schema_name("Property Graph", &self.name)?;
        if self.node_tables.is_empty() {
            return Err(Error::schema(format!(
                "Property graph {} must define at least one node table.",
                self.name
            )));
        }
        for id in self.node_tables.iter().chain(self.edge_tables.iter()) {
            let table: &Table = ctx.require(*id, "Property graph")?;
            if !table.is_public() {
                return Err(Error::schema(format!(
                    "Property graph {} cannot use an index data table.",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
