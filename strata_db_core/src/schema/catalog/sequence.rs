use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity};

use super::named_schema::require_named_schema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    #[default]
    BitReversedPositive,
}

impl SequenceKind {
    pub fn option_value(&self) -> &'static str {
        match self {
            SequenceKind::BitReversedPositive => "bit_reversed_positive",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("bit_reversed_positive") {
            Ok(SequenceKind::BitReversedPositive)
        } else {
            Err(Error::schema(format!("Unsupported sequence kind: {value}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub id: NodeId,
    pub name: String,
    pub kind: SequenceKind,
    /// Whether the kind came from the database's default_sequence_kind.
    pub uses_default_kind: bool,
    pub start_with_counter: Option<i64>,
    /// Inclusive range of values the sequence never returns.
    pub skip_range: Option<(i64, i64)>,
    /// Backs an identity column; hidden from lookups and dumps.
    pub internal: bool,
}

impl SchemaEntity for Sequence {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Sequence
    }

    fn name_info(&self) -> Vec<NameInfo> {
        vec![NameInfo::global(&self.name)]
    }

    fn references(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn deep_clone(&mut self, _ctx: &CloneContext<'_>) -> Result<()> {
        Ok(())
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        if !self.internal {
            validate_schema_name("Sequence", &self.name)?;
            require_named_schema(ctx.graph(), &self.name)?;
        }
        if let Some(start) = self.start_with_counter {
            if start < 1 {
                return Err(Error::schema(format!(
                    "Invalid start_with_counter value for sequence {}: {start}. It must be at least 1.",
                    self.name
                )));
            }
        }
        if let Some((min, max)) = self.skip_range {
            if min > max {
                return Err(Error::schema(format!(
                    "Invalid skip range for sequence {}: skip_range_min ({min}) is larger than skip_range_max ({max}).",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
