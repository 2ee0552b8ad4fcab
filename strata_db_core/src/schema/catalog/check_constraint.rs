use crate::error::{Error, Result};
use crate::eval::Expression;
use crate::schema::context::{SchemaChangeAction, ValidationContext};
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_schema_name;
use crate::schema::node::{NodeKind, SchemaEntity};

use super::{Column, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub id: NodeId,
    pub name: String,
    pub generated_name: bool,
    pub table: NodeId,
    pub expression: Expression,
    /// Columns read by the expression.
    pub dependent_columns: Vec<NodeId>,
}

impl SchemaEntity for CheckConstraint {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::CheckConstraint
    }

    fn references(&self) -> Vec<NodeId> {
        let mut refs = vec![self.table];
        refs.extend(self.dependent_columns.iter().copied());
        refs
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require(&*self, self.table)?;
        ctx.require_all(&*self, &self.dependent_columns)
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_schema_name("Check Constraint", &self.name)?;
        let table: &Table = ctx.require(self.table, "Check constraint")?;
        if self.expression.uses_sequences() {
            return Err(Error::schema(format!(
                "Check constraint `{}` uses a non-deterministic function.",
                self.name
            )));
        }
        let mut resolved = Vec::new();
        for name in self.expression.referenced_columns() {
            let column = table.find_column(ctx.graph(), &name).ok_or_else(|| {
                Error::schema(format!(
                    "Check constraint `{}` references unknown column {}.",
                    self.name, name
                ))
            })?;
            resolved.push(column.id);
        }
        let mut declared = self.dependent_columns.clone();
        declared.sort();
        resolved.sort();
        if declared != resolved {
            return Err(Error::Internal(format!(
                "dependent columns of check constraint {} are out of date",
                self.name
            )));
        }
        for id in &self.dependent_columns {
            let column: &Column = ctx.require(*id, "Check constraint")?;
            if column.generated.as_ref().map(|g| !g.stored).unwrap_or(false) {
                return Err(Error::schema(format!(
                    "Check constraint `{}` cannot use non-stored generated column {}.",
                    self.name, column.name
                )));
            }
            if column.allows_commit_timestamp {
                return Err(Error::schema(format!(
                    "Check constraint `{}` cannot use commit timestamp column {}.",
                    self.name, column.name
                )));
            }
        }
        if !ctx.existed_before(self.id) && ctx.existed_before(self.table) {
            ctx.add_action(SchemaChangeAction::VerifyCheckConstraint {
                table: self.table,
                check: self.id,
            });
        }
        Ok(())
    }
}
