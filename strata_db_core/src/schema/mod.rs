//! Versioned schema catalog.
//!
//! A [`SchemaGraph`] holds every entity of one schema version as nodes
//! addressed by [`NodeId`]. [`SchemaGraphEditor`] derives the next version
//! copy-on-write, and [`Schema`] is the name-lookup facade over one graph.
//! DDL statements are applied by [`SchemaUpdater`].

pub mod catalog;
pub mod context;
pub mod ddl;
mod dump;
pub mod editor;
mod facade;
pub mod graph;
pub mod names;
pub mod node;
pub mod printer;
pub mod updater;

pub use context::{SchemaChangeAction, ValidationContext};
pub use ddl::DdlStatement;
pub use editor::{CloneContext, SchemaGraphEditor};
pub use facade::{FINGERPRINT_LENGTH, Schema, SchemaVersion};
pub use graph::{NodeId, SchemaGraph};
pub use names::split_schema_name;
pub use node::{NodeKind, NodeVariant, SchemaEntity, SchemaNode};
pub use updater::{SchemaChange, SchemaUpdater};
