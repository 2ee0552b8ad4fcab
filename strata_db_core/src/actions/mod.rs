//! Per-table data actions that keep rows consistent with the schema.
//!
//! Actions run in four phases around every write:
//!
//! 1. validators look at a single write before it is staged,
//! 2. effectors derive further writes from it (cascades, defaults,
//!    generated values, stale index entries),
//! 3. modifiers run at commit and project final rows into index tables,
//! 4. verifiers run last and check constraints spanning rows.
//!
//! The [`ActionRegistry`] holds the actions of one schema version and the
//! [`ActionManager`] maps published versions to their registries.

pub mod context;
pub mod effectors;
pub mod manager;
pub mod modifiers;
pub mod ops;
pub mod registry;
pub mod validators;
pub mod verifiers;

use crate::error::Result;

pub use context::{ActionContext, RowReader, StorageReader};
pub use manager::ActionManager;
pub use ops::{DeleteOp, MutationKind, MutationOp, RowOp, WriteOp};
pub use registry::ActionRegistry;

/// Checks a single write in isolation.
pub trait Validator: Send + Sync {
    fn validate(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()>;
    fn describe(&self) -> String;
}

/// Derives additional writes from a staged write.
pub trait Effector: Send + Sync {
    fn effect(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()>;
    fn describe(&self) -> String;
}

/// Produces writes from the final state of a row at commit.
pub trait Modifier: Send + Sync {
    fn modify(&self, ctx: &mut ActionContext<'_>, op: &WriteOp) -> Result<()>;
    fn describe(&self) -> String;
}

/// Checks the final state of a transaction.
pub trait Verifier: Send + Sync {
    fn verify(&self, ctx: &ActionContext<'_>, op: &WriteOp) -> Result<()>;
    fn describe(&self) -> String;
}
