use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::{validate_identifier, validate_schema_name};
use crate::schema::node::{NodeKind, SchemaEntity};
use crate::types::datatype::DataType;

use super::named_schema::require_named_schema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlSecurity {
    #[default]
    Invoker,
    Definer,
}

impl SqlSecurity {
    pub fn sql(&self) -> &'static str {
        match self {
            SqlSecurity::Invoker => "INVOKER",
            SqlSecurity::Definer => "DEFINER",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub id: NodeId,
    pub name: String,
    pub security: SqlSecurity,
    pub body: String,
    /// Tables, views and functions the body reads.
    pub dependencies: Vec<NodeId>,
}

impl SchemaEntity for View {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::View
    }

    fn references(&self) -> Vec<NodeId> {
        self.dependencies.clone()
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require_all(&*self, &self.dependencies)
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_schema_name("View", &self.name)?;
        require_named_schema(ctx.graph(), &self.name)?;
        if self.body.trim().is_empty() {
            return Err(Error::schema(format!("View {} has an empty definition.", self.name)));
        }
        check_dependencies(ctx, self.id, &self.name, &self.dependencies)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdfParameter {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Udf {
    pub id: NodeId,
    pub name: String,
    pub parameters: Vec<UdfParameter>,
    pub return_type: Option<DataType>,
    pub security: SqlSecurity,
    pub body: String,
    pub dependencies: Vec<NodeId>,
}

impl SchemaEntity for Udf {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Udf
    }

    fn references(&self) -> Vec<NodeId> {
        self.dependencies.clone()
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require_all(&*self, &self.dependencies)
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_schema_name("Function", &self.name)?;
        require_named_schema(ctx.graph(), &self.name)?;
        if self.body.trim().is_empty() {
            return Err(Error::schema(format!("Function {} has an empty body.", self.name)));
        }
        let mut names = std::collections::HashSet::new();
        for param in &self.parameters {
            validate_identifier("Parameter", &param.name)?;
            if !names.insert(param.name.to_lowercase()) {
                return Err(Error::schema(format!(
                    "Function {} declares parameter {} more than once.",
                    self.name, param.name
                )));
            }
        }
        check_dependencies(ctx, self.id, &self.name, &self.dependencies)
    }
}

// Dependencies must exist and must not lead back to the object itself.
fn check_dependencies(
    ctx: &ValidationContext<'_>,
    id: NodeId,
    name: &str,
    dependencies: &[NodeId],
) -> Result<()> {
    let graph = ctx.graph();
    let mut stack: Vec<NodeId> = dependencies.to_vec();
    let mut seen = std::collections::HashSet::new();
    while let Some(dep) = stack.pop() {
        if dep == id {
            return Err(Error::schema(format!(
                "Cycle detected while analyzing the dependencies of {name}."
            )));
        }
        if !seen.insert(dep) {
            continue;
        }
        let node = graph
            .get(dep)
            .ok_or_else(|| Error::schema(format!("{name} depends on a missing object.")))?;
        if let Some(view) = node.as_view() {
            stack.extend(view.dependencies.iter().copied());
        } else if let Some(udf) = node.as_udf() {
            stack.extend(udf.dependencies.iter().copied());
        }
    }
    Ok(())
}
