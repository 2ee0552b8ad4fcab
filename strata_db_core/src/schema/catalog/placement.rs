use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity};

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: NodeId,
    pub name: String,
    pub instance_partition: Option<String>,
    pub default_leader: Option<String>,
}

impl SchemaEntity for Placement {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Placement
    }

    fn name_info(&self) -> Vec<NameInfo> {
        vec![NameInfo::scoped("placement", &self.name)]
    }

    fn references(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn deep_clone(&mut self, _ctx: &CloneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Internal("placement without a name".to_string()));
        }
        validate_schema_name("Placement", &self.name)?;
        for (option, value) in [
            ("instance_partition", &self.instance_partition),
            ("default_leader", &self.default_leader),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::schema(format!(
                    "Placement {} has an empty {option} option.",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
