use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::{validate_identifier, validate_schema_name};
use crate::schema::node::{NodeKind, SchemaEntity};
use crate::types::datatype::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelColumn {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub id: NodeId,
    pub name: String,
    pub remote: bool,
    pub input: Vec<ModelColumn>,
    pub output: Vec<ModelColumn>,
    pub endpoint: Option<String>,
    pub endpoints: Vec<String>,
    pub default_batch_size: Option<i64>,
}

fn check_columns(model: &str, side: &str, columns: &[ModelColumn]) -> Result<()> {
    if columns.is_empty() {
        return Err(Error::schema(format!(
            "Model {model} must declare at least one {side} column."
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for column in columns {
        validate_identifier("Model column", &column.name)?;
        if !seen.insert(column.name.to_lowercase()) {
            return Err(Error::schema(format!(
                "Model {model} declares {side} column {} more than once.",
                column.name
            )));
        }
    }
    Ok(())
}

impl SchemaEntity for Model {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Model
    }

    fn references(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn deep_clone(&mut self, _ctx: &CloneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_schema_name("Model", &self.name)?;
        check_columns(&self.name, "input", &self.input)?;
        check_columns(&self.name, "output", &self.output)?;
        if !self.remote {
            return Err(Error::schema(format!(
                "Model {} must be REMOTE.",
                self.name
            )));
        }
        match (&self.endpoint, self.endpoints.is_empty()) {
            (None, true) => {
                return Err(Error::schema(format!(
                    "Model {} requires either endpoint or endpoints.",
                    self.name
                )));
            }
            (Some(_), false) => {
                return Err(Error::schema(format!(
                    "Model {} cannot set both endpoint and endpoints.",
                    self.name
                )));
            }
            _ => {}
        }
        if let Some(size) = self.default_batch_size {
            if size <= 0 {
                return Err(Error::schema(format!(
                    "Model {} default_batch_size must be positive.",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
