use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity};

use super::change_stream::parse_retention_period;
use super::sequence::SequenceKind;

/// Options set through `ALTER DATABASE ... SET OPTIONS`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseOptions {
    pub id: NodeId,
    pub name: String,
    pub default_time_zone: Option<String>,
    pub default_sequence_kind: Option<String>,
    pub version_retention_period: Option<String>,
    pub optimizer_version: Option<String>,
    pub witness_location: Option<String>,
}

impl DatabaseOptions {
    pub fn default_sequence_kind(&self) -> Option<SequenceKind> {
        self.default_sequence_kind
            .as_deref()
            .and_then(|kind| SequenceKind::parse(kind).ok())
    }

    /// Options in dump order, skipping unset ones.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("default_time_zone", &self.default_time_zone),
            ("default_sequence_kind", &self.default_sequence_kind),
            ("version_retention_period", &self.version_retention_period),
            ("optimizer_version", &self.optimizer_version),
            ("witness_location", &self.witness_location),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

impl SchemaEntity for DatabaseOptions {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::DatabaseOptions
    }

    fn name_info(&self) -> Vec<NameInfo> {
        vec![NameInfo::scoped("database", "options")]
    }

    fn references(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn deep_clone(&mut self, _ctx: &CloneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<()> {
        if let Some(kind) = &self.default_sequence_kind {
            SequenceKind::parse(kind)?;
        }
        if let Some(period) = &self.version_retention_period {
            let seconds = parse_retention_period(period).ok_or_else(|| {
                Error::schema(format!("Invalid version_retention_period: {period}."))
            })?;
            if !(3_600..=7 * 86_400).contains(&seconds) {
                return Err(Error::schema(
                    "version_retention_period must be between 1h and 7d.".to_string(),
                ));
            }
        }
        if let Some(version) = &self.optimizer_version {
            if version.parse::<u32>().is_err() {
                return Err(Error::schema(format!(
                    "Invalid optimizer_version: {version}."
                )));
            }
        }
        Ok(())
    }
}
