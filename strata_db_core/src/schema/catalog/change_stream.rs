use crate::error::{Error, Result};
use crate::schema::context::ValidationContext;
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NodeKind, SchemaEntity};

use super::{Column, Table};

pub const VALUE_CAPTURE_TYPES: [&str; 4] = [
    "OLD_AND_NEW_VALUES",
    "NEW_ROW",
    "NEW_VALUES",
    "NEW_ROW_AND_OLD_VALUES",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTable {
    pub table: NodeId,
    /// `None` tracks every column; `Some(vec![])` tracks only the key.
    pub columns: Option<Vec<NodeId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStreamFor {
    All,
    Tables(Vec<TrackedTable>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeStream {
    pub id: NodeId,
    pub name: String,
    pub for_clause: Option<ChangeStreamFor>,
    pub value_capture_type: Option<String>,
    pub retention_period: Option<String>,
    pub exclude_insert: Option<bool>,
    pub exclude_update: Option<bool>,
    pub exclude_delete: Option<bool>,
    pub exclude_ttl_deletes: Option<bool>,
}

impl ChangeStream {
    pub fn tracks_table(&self, table: NodeId) -> bool {
        match &self.for_clause {
            Some(ChangeStreamFor::All) => true,
            Some(ChangeStreamFor::Tables(tables)) => tables.iter().any(|t| t.table == table),
            None => false,
        }
    }

    fn tracked_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        if let Some(ChangeStreamFor::Tables(tables)) = &self.for_clause {
            for tracked in tables {
                ids.push(tracked.table);
                ids.extend(tracked.columns.iter().flatten().copied());
            }
        }
        ids
    }
}

/// Parses retention periods like `7d`, `36h`, `90m` or `3600s`.
pub fn parse_retention_period(value: &str) -> Option<i64> {
    let value = value.trim();
    let unit = value.chars().last()?;
    let amount: i64 = value[..value.len() - unit.len_utf8()].parse().ok()?;
    let seconds = match unit {
        'd' => amount.checked_mul(86_400)?,
        'h' => amount.checked_mul(3_600)?,
        'm' => amount.checked_mul(60)?,
        's' => amount,
        _ => return None,
    };
    (seconds > 0).then_some(seconds)
}

impl SchemaEntity for ChangeStream {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::ChangeStream
    }

    fn references(&self) -> Vec<NodeId> {
        self.tracked_ids()
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require_all(&*self, &self.tracked_ids())
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_schema_name("Change Stream", &self.name)?;
        if let Some(capture) = &self.value_capture_type {
            if !VALUE_CAPTURE_TYPES.iter().any(|v| v.eq_ignore_ascii_case(capture)) {
                return Err(Error::schema(format!(
                    "Invalid value_capture_type for change stream {}: {capture}.",
                    self.name
                )));
            }
        }
        if let Some(period) = &self.retention_period {
            let seconds = parse_retention_period(period).ok_or_else(|| {
                Error::schema(format!(
                    "Invalid retention_period for change stream {}: {period}.",
                    self.name
                ))
            })?;
            const MIN: i64 = 86_400;
            const MAX: i64 = 30 * 86_400;
            if !(MIN..=MAX).contains(&seconds) {
                return Err(Error::schema(format!(
                    "Change stream {} retention_period must be between 1d and 30d.",
                    self.name
                )));
            }
        }
        if let Some(ChangeStreamFor::Tables(tables)) = &self.for_clause {
            let mut seen = std::collections::HashSet::new();
            for tracked in tables {
                let table: &Table = ctx.require(tracked.table, "Change stream")?;
                if !table.is_public() {
                    return Err(Error::schema(format!(
                        "Change stream {} cannot track an index data table.",
                        self.name
                    )));
                }
                if !seen.insert(tracked.table) {
                    return Err(Error::schema(format!(
                        "Change stream {} lists table {} more than once.",
                        self.name, table.name
                    )));
                }
                for column in tracked.columns.iter().flatten() {
                    let column: &Column = ctx.require(*column, "Change stream")?;
                    if column.table != table.id {
                        return Err(Error::schema(format!(
                            "Change stream {} tracks column {} which is not in table {}.",
                            self.name, column.name, table.name
                        )));
                    }
                    if table.is_key_column(column.id) {
                        return Err(Error::schema(format!(
                            "Change stream {} cannot explicitly track key column {}.{}.",
                            self.name, table.name, column.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
