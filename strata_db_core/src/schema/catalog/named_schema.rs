use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::{NodeId, SchemaGraph};
use crate::schema::names::{split_schema_name, validate_identifier};
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity};

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSchema {
    pub id: NodeId,
    pub name: String,
}

/// Fails when `name` is qualified by a named schema that does not exist.
pub fn require_named_schema(graph: &SchemaGraph, name: &str) -> Result<()> {
    let (schema, _) = split_schema_name(name);
    if schema.is_empty() {
        return Ok(());
    }
    let exists = graph
        .iter_as::<NamedSchema>()
        .any(|s| s.name.eq_ignore_ascii_case(schema));
    if !exists {
        return Err(Error::schema(format!("Schema not found: {schema}.")));
    }
    Ok(())
}

impl SchemaEntity for NamedSchema {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::NamedSchema
    }

    fn name_info(&self) -> Vec<NameInfo> {
        vec![NameInfo::scoped("schema", &self.name)]
    }

    fn references(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn deep_clone(&mut self, _ctx: &CloneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_identifier("Schema", &self.name)
    }
}
