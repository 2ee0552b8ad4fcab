//! Versioned schema catalog with per-table data actions.
//!
//! [`Database`] owns the published schema versions, their action
//! registries and the row storage. Schema changes go through
//! [`Database::update_schema`]; data changes through [`Transaction`]s
//! started with [`Database::begin`].

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

pub mod actions;
pub mod backfill;
pub mod error;
pub mod eval;
pub mod schema;
pub mod storage;
pub mod transaction;
pub mod types;

pub use actions::{ActionManager, ActionRegistry, MutationKind, MutationOp};
pub use error::{Error, Result};
pub use eval::FunctionCatalog;
pub use schema::{DdlStatement, Schema, SchemaVersion};
pub use transaction::{Phase, TraceEvent, Transaction};
pub use types::value::Value;

use schema::SchemaUpdater;
use storage::{MemStorage, StorageEngine};

pub struct Database {
    storage: RwLock<Box<dyn StorageEngine>>,
    schema: RwLock<Arc<Schema>>,
    actions: ActionManager,
    functions: Arc<FunctionCatalog>,
    /// Serializes schema updates.
    ddl: Mutex<()>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// An empty database over in-memory storage.
    pub fn new() -> Self {
        Self::with_storage(Box::new(MemStorage::new()))
    }

    pub fn with_storage(storage: Box<dyn StorageEngine>) -> Self {
        let schema = Arc::new(Schema::empty());
        let functions = Arc::new(FunctionCatalog::new());
        let actions = ActionManager::for_schema(schema.clone(), functions.clone());
        Self {
            storage: RwLock::new(storage),
            schema: RwLock::new(schema),
            actions,
            functions,
            ddl: Mutex::new(()),
        }
    }

    /// Replaces the function catalog used by expressions. Only the current
    /// version keeps a registry, rebuilt over the new catalog.
    pub fn with_functions(mut self, functions: Arc<FunctionCatalog>) -> Self {
        self.actions = ActionManager::for_schema(self.schema(), functions.clone());
        self.functions = functions;
        self
    }

    /// The latest published schema.
    pub fn schema(&self) -> Arc<Schema> {
        self.schema.read().clone()
    }

    pub fn functions(&self) -> &Arc<FunctionCatalog> {
        &self.functions
    }

    pub fn action_manager(&self) -> &ActionManager {
        &self.actions
    }

    /// Starts a transaction on the latest published schema.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        let schema = self.schema();
        let registry = self.actions.get_actions_for_schema(schema.version())?;
        Ok(Transaction::new(registry, &self.storage))
    }

    /// Applies `statements` one at a time. Every successful statement is
    /// published as its own version; the first failure stops the batch and
    /// is returned, leaving earlier statements published.
    pub fn update_schema(&self, statements: &[DdlStatement]) -> Result<SchemaVersion> {
        let _ddl = self.ddl.lock();
        for statement in statements {
            let base = self.schema();
            let change = SchemaUpdater::apply(&base, statement, base.version().next())?;
            let schema = Arc::new(change.schema);
            {
                let mut storage = self.storage.write();
                backfill::run_schema_change_actions(
                    &schema,
                    &self.functions,
                    &mut **storage,
                    &change.actions,
                )?;
            }
            self.actions
                .add_actions_for_schema(schema.clone(), self.functions.clone())?;
            debug!(version = %schema.version(), statement = %statement.label(), "published schema");
            *self.schema.write() = schema;
        }
        Ok(self.schema().version())
    }

    /// The current schema as DDL statements.
    pub fn dump(&self) -> Vec<DdlStatement> {
        self.schema().dump()
    }

    /// The current schema as DDL text.
    pub fn print_ddl(&self) -> Vec<String> {
        schema::printer::print_ddl_statements(&self.schema())
    }
}
