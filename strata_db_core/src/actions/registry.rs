use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::Result;
use crate::eval::{Evaluator, FunctionCatalog};
use crate::schema::Schema;
use crate::schema::catalog::{CheckConstraint, Column, ForeignKey, Index, OnDeleteAction, Table};
use crate::schema::graph::NodeId;
use crate::types::value::Value;

use super::context::ActionContext;
use super::effectors::{
    ColumnDefaultEffector, ForeignKeyActionEffector, GeneratedColumnEffector, IndexEffector,
    InterleaveParentEffector,
};
use super::modifiers::IndexModifier;
use super::ops::{MutationOp, WriteOp};
use super::validators::{
    ColumnValueValidator, InterleaveChildValidator, InterleaveParentValidator,
    RowExistenceValidator,
};
use super::verifiers::{
    CheckConstraintVerifier, ForeignKeyReferencedVerifier, ForeignKeyReferencingVerifier,
    UniqueIndexVerifier,
};
use super::{Effector, Modifier, Validator, Verifier};

/// The actions of one schema version, grouped by the table they fire on.
pub struct ActionRegistry {
    evaluator: Evaluator,
    validators: HashMap<NodeId, Vec<Box<dyn Validator>>>,
    effectors: HashMap<NodeId, Vec<Box<dyn Effector>>>,
    modifiers: HashMap<NodeId, Vec<Box<dyn Modifier>>>,
    verifiers: HashMap<NodeId, Vec<Box<dyn Verifier>>>,
    /// Keyed by lower-cased table name.
    generated_key_effectors: HashMap<String, GeneratedColumnEffector>,
}

impl ActionRegistry {
    pub fn new(schema: Arc<Schema>, functions: Arc<FunctionCatalog>) -> Self {
        let mut registry = Self {
            evaluator: Evaluator::new(schema.clone(), functions),
            validators: HashMap::new(),
            effectors: HashMap::new(),
            modifiers: HashMap::new(),
            verifiers: HashMap::new(),
            generated_key_effectors: HashMap::new(),
        };
        registry.build(&schema);
        debug!(
            version = %schema.version(),
            tables = registry.validators.len(),
            "built action registry"
        );
        registry
    }

    fn build(&mut self, schema: &Schema) {
        let placements: BTreeSet<String> = schema.placements().map(|p| p.name.clone()).collect();

        for table in schema.tables() {
            let validators = self.validators.entry(table.id).or_default();
            validators.push(Box::new(ColumnValueValidator::new(table, placements.clone())));
            validators.push(Box::new(RowExistenceValidator::new(table)));

            for child in schema.children_of(table.id) {
                self.validators
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(InterleaveParentValidator::new(table, child)));
                self.effectors
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(InterleaveParentEffector::new(table, child)));
            }
            if let Some(parent) = table.parent.and_then(|id| schema.get::<Table>(id)) {
                self.validators
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(InterleaveChildValidator::new(parent, table)));
            }

            for index in table.indexes.iter().filter_map(|id| schema.get::<Index>(*id)) {
                self.effectors
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(IndexEffector::new(index)));
                self.modifiers
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(IndexModifier::new(index)));
                if index.unique {
                    self.verifiers
                        .entry(index.data_table)
                        .or_default()
                        .push(Box::new(UniqueIndexVerifier::new(index)));
                }
            }

            for fk in table.foreign_keys.iter().filter_map(|id| schema.get::<ForeignKey>(*id)) {
                if !fk.enforced {
                    continue;
                }
                self.verifiers
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(ForeignKeyReferencingVerifier::new(fk)));
            }
            for fk in schema.referencing_foreign_keys(table.id) {
                if !fk.enforced {
                    continue;
                }
                self.verifiers
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(ForeignKeyReferencedVerifier::new(fk)));
                if fk.on_delete == OnDeleteAction::Cascade {
                    self.effectors
                        .entry(table.id)
                        .or_default()
                        .push(Box::new(ForeignKeyActionEffector::new(fk)));
                }
            }

            for check in table
                .check_constraints
                .iter()
                .filter_map(|id| schema.get::<CheckConstraint>(*id))
            {
                self.verifiers
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(CheckConstraintVerifier::new(check)));
            }

            let columns: Vec<&Column> = schema.table_columns(table);
            let generated_key = columns.iter().any(|c| {
                table.is_key_column(c.id) && (c.has_default_value() || c.is_generated())
            });
            if generated_key {
                self.generated_key_effectors.insert(
                    table.name.to_lowercase(),
                    GeneratedColumnEffector::new(schema, table, true),
                );
            }
            for column in &columns {
                if !table.is_key_column(column.id)
                    && !column.is_generated()
                    && column.has_default_value()
                {
                    self.effectors
                        .entry(table.id)
                        .or_default()
                        .push(Box::new(ColumnDefaultEffector::new(column)));
                }
            }
            if columns
                .iter()
                .any(|c| !table.is_key_column(c.id) && c.is_generated())
            {
                self.effectors
                    .entry(table.id)
                    .or_default()
                    .push(Box::new(GeneratedColumnEffector::new(schema, table, false)));
            }
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.evaluator.schema()
    }

    pub fn execute_validators(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        for validator in self.validators.get(&op.table()).into_iter().flatten() {
            trace!(action = %validator.describe(), op = op.kind_str(), "validate");
            validator.validate(ctx, op)?;
        }
        Ok(())
    }

    /// Fills in key values the mutation leaves to defaults, identity
    /// sequences or generation expressions.
    pub fn execute_generated_key_effectors(
        &self,
        mutation: &MutationOp,
        generated_values: &mut Vec<Vec<Value>>,
        generated_columns: &mut Vec<String>,
    ) -> Result<()> {
        let Some(effector) = self
            .generated_key_effectors
            .get(&self.canonical_table_name(&mutation.table))
        else {
            return Ok(());
        };
        trace!(action = %effector.describe(), "generate keys");
        effector.generate_keys(&self.evaluator, mutation, generated_values, generated_columns)
    }

    pub fn execute_effectors(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        for effector in self.effectors.get(&op.table()).into_iter().flatten() {
            trace!(action = %effector.describe(), op = op.kind_str(), "effect");
            effector.effect(ctx, op)?;
        }
        Ok(())
    }

    pub fn execute_modifiers(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()> {
        for modifier in self.modifiers.get(&op.table()).into_iter().flatten() {
            trace!(action = %modifier.describe(), op = op.kind_str(), "modify");
            modifier.modify(ctx, op)?;
        }
        Ok(())
    }

    pub fn execute_verifiers(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()> {
        for verifier in self.verifiers.get(&op.table()).into_iter().flatten() {
            trace!(action = %verifier.describe(), op = op.kind_str(), "verify");
            verifier.verify(ctx, op)?;
        }
        Ok(())
    }

    /// Key columns the generated key effector of `mutation`'s table will
    /// fill because the mutation does not supply them.
    pub fn pending_key_columns(&self, mutation: &MutationOp) -> BTreeSet<NodeId> {
        let Some(effector) = self
            .generated_key_effectors
            .get(&self.canonical_table_name(&mutation.table))
        else {
            return BTreeSet::new();
        };
        let schema = self.evaluator.schema();
        effector
            .columns()
            .iter()
            .filter_map(|id| schema.get::<Column>(*id))
            .filter(|c| !mutation.columns.iter().any(|m| m.eq_ignore_ascii_case(&c.name)))
            .map(|c| c.id)
            .collect()
    }

    /// Synonyms resolve to the table they name.
    fn canonical_table_name(&self, name: &str) -> String {
        self.evaluator
            .schema()
            .find_table(name)
            .map(|t| t.name.to_lowercase())
            .unwrap_or_else(|| name.to_lowercase())
    }

    /// Action descriptions per table name, in execution order.
    pub fn describe(&self) -> BTreeMap<String, Vec<String>> {
        let schema = self.evaluator.schema();
        let name = |id: &NodeId| {
            schema
                .get::<Table>(*id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, actions) in &self.validators {
            out.entry(name(id))
                .or_default()
                .extend(actions.iter().map(|a| a.describe()));
        }
        for (table, effector) in &self.generated_key_effectors {
            let key = schema
                .find_table(table)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| table.clone());
            out.entry(key).or_default().push(effector.describe());
        }
        for (id, actions) in &self.effectors {
            out.entry(name(id))
                .or_default()
                .extend(actions.iter().map(|a| a.describe()));
        }
        for (id, actions) in &self.modifiers {
            out.entry(name(id))
                .or_default()
                .extend(actions.iter().map(|a| a.describe()));
        }
        for (id, actions) in &self.verifiers {
            out.entry(name(id))
                .or_default()
                .extend(actions.iter().map(|a| a.describe()));
        }
        out
    }
}

impl PartialEq for ActionRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.describe() == other.describe()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("version", &self.evaluator.schema().version())
            .field("actions", &self.describe())
            .finish()
    }
}
