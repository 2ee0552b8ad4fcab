//! Expression evaluation for column defaults, generated columns and check
//! constraints.
//!
//! The schema and action layers only see [`Expression`] and [`Evaluator`];
//! parsing and function dispatch stay behind this module.

mod expr;
mod functions;
mod parser;
mod tokenizer;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub use expr::{BinaryOp, Expr, UnaryOp};
pub use functions::{FunctionCatalog, ScalarFunction, SequenceStore, bit_reversed_positive};

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::value::Value;

/// Source of column values and sequence values while evaluating.
pub trait EvalContext {
    /// Value of the named column, matched case-insensitively.
    fn column_value(&self, name: &str) -> Option<Value>;

    fn next_sequence_value(&self, sequence: &str) -> Result<Value>;
}

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    text: String,
    root: Expr,
}

impl Expression {
    pub fn parse(text: &str) -> Result<Self> {
        let root = parser::parse_expression(text)?;
        Ok(Self {
            text: text.trim().to_string(),
            root,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Column names the expression reads, lowercased.
    pub fn referenced_columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.root.visit(&mut |e| {
            if let Expr::Column(name) = e {
                out.insert(name.to_lowercase());
            }
        });
        out
    }

    /// Sequence names used through `GET_NEXT_SEQUENCE_VALUE`.
    pub fn referenced_sequences(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.visit(&mut |e| {
            if let Expr::NextSequenceValue(name) = e {
                out.push(name.clone());
            }
        });
        out
    }

    pub fn uses_sequences(&self) -> bool {
        !self.referenced_sequences().is_empty()
    }

    /// Function names called by the expression.
    pub fn called_functions(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.visit(&mut |e| {
            if let Expr::Function { name, .. } = e {
                out.push(name.clone());
            }
        });
        out
    }

    pub fn evaluate(&self, ctx: &dyn EvalContext, functions: &FunctionCatalog) -> Result<Value> {
        self.root.evaluate(ctx, functions)
    }
}

/// Binds a schema version to a function catalog so expressions can be
/// evaluated against row values.
#[derive(Debug, Clone)]
pub struct Evaluator {
    schema: Arc<Schema>,
    functions: Arc<FunctionCatalog>,
}

impl Evaluator {
    pub fn new(schema: Arc<Schema>, functions: Arc<FunctionCatalog>) -> Self {
        Self { schema, functions }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn functions(&self) -> &Arc<FunctionCatalog> {
        &self.functions
    }

    /// Evaluates `expr` with `row` supplying column values by lowercase name.
    pub fn evaluate(&self, expr: &Expression, row: &HashMap<String, Value>) -> Result<Value> {
        let scope = RowScope {
            evaluator: self,
            row,
        };
        expr.evaluate(&scope, &self.functions)
    }
}

struct RowScope<'a> {
    evaluator: &'a Evaluator,
    row: &'a HashMap<String, Value>,
}

impl EvalContext for RowScope<'_> {
    fn column_value(&self, name: &str) -> Option<Value> {
        self.row.get(&name.to_lowercase()).cloned()
    }

    fn next_sequence_value(&self, sequence: &str) -> Result<Value> {
        let seq = self
            .evaluator
            .schema
            .find_sequence(sequence, false)
            .ok_or_else(|| Error::Expression(format!("Sequence not found: {sequence}")))?;
        self.evaluator.functions.sequences().next_value(seq)
    }
}
