use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::eval::FunctionCatalog;
use crate::schema::{Schema, SchemaVersion};

use super::ActionRegistry;

/// Registries of every published schema version.
///
/// A registry is built once per version and shared by all transactions
/// that started on that version. Registries are evicted explicitly.
#[derive(Default)]
pub struct ActionManager {
    registries: Mutex<HashMap<SchemaVersion, Arc<ActionRegistry>>>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager holding the registry of `schema` only.
    pub fn for_schema(schema: Arc<Schema>, functions: Arc<FunctionCatalog>) -> Self {
        let version = schema.version();
        let registry = Arc::new(ActionRegistry::new(schema, functions));
        Self {
            registries: Mutex::new(HashMap::from([(version, registry)])),
        }
    }

    /// Builds and registers the registry of `schema`. Registering the same
    /// schema twice is a no-op; a different schema under a registered
    /// version is rejected and the first registry is kept.
    pub fn add_actions_for_schema(
        &self,
        schema: Arc<Schema>,
        functions: Arc<FunctionCatalog>,
    ) -> Result<()> {
        let version = schema.version();
        match self.registries.lock().entry(version) {
            Entry::Occupied(entry) if Arc::ptr_eq(entry.get().schema(), &schema) => Ok(()),
            Entry::Occupied(_) => Err(Error::AlreadyExists(format!(
                "Schema version {version} is already registered with the action manager"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(ActionRegistry::new(schema, functions)));
                Ok(())
            }
        }
    }

    pub fn get_actions_for_schema(&self, version: SchemaVersion) -> Result<Arc<ActionRegistry>> {
        self.registries.lock().get(&version).cloned().ok_or_else(|| {
            Error::NotFound(format!(
                "Schema version {version} was not registered with the action manager"
            ))
        })
    }

    /// Drops the registry of `version`; returns whether one was registered.
    pub fn remove_actions_for_schema(&self, version: SchemaVersion) -> bool {
        let removed = self.registries.lock().remove(&version).is_some();
        if removed {
            debug!(%version, "evicted action registry");
        }
        removed
    }

    pub fn registered_versions(&self) -> Vec<SchemaVersion> {
        let mut versions: Vec<SchemaVersion> = self.registries.lock().keys().copied().collect();
        versions.sort();
        versions
    }
}
