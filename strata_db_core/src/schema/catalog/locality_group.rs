use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_identifier;
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity};

use super::change_stream::parse_retention_period;

/// Name of the locality group every table belongs to unless told otherwise.
pub const DEFAULT_LOCALITY_GROUP: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Ssd,
    Hdd,
}

impl StorageKind {
    pub fn option_value(&self) -> &'static str {
        match self {
            StorageKind::Ssd => "ssd",
            StorageKind::Hdd => "hdd",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalityGroup {
    pub id: NodeId,
    pub name: String,
    pub storage: Option<StorageKind>,
    pub ssd_to_hdd_spill_timespans: Vec<String>,
}

impl SchemaEntity for LocalityGroup {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::LocalityGroup
    }

    fn name_info(&self) -> Vec<NameInfo> {
        vec![NameInfo::scoped("locality_group", &self.name)]
    }

    fn references(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn deep_clone(&mut self, _ctx: &CloneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        if !self.name.eq_ignore_ascii_case(DEFAULT_LOCALITY_GROUP) {
            validate_identifier("Locality Group", &self.name)?;
        }
        for span in &self.ssd_to_hdd_spill_timespans {
            if parse_retention_period(span).is_none() {
                return Err(Error::schema(format!(
                    "Invalid ssd_to_hdd_spill_timespan for locality group {}: {span}.",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
