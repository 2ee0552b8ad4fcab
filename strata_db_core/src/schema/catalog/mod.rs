//! Schema entities. Every entity is plain data; cross references are
//! [`NodeId`]s resolved against the graph of the same version.

pub mod change_stream;
pub mod check_constraint;
pub mod column;
pub mod database_options;
pub mod foreign_key;
pub mod index;
pub mod locality_group;
pub mod model;
pub mod named_schema;
pub mod placement;
pub mod property_graph;
pub mod sequence;
pub mod table;
pub mod view;

use serde::{Deserialize, Serialize};

use crate::schema::graph::NodeId;

pub use change_stream::{ChangeStream, ChangeStreamFor, TrackedTable};
pub use check_constraint::CheckConstraint;
pub use column::{Column, GeneratedColumn};
pub use database_options::DatabaseOptions;
pub use foreign_key::ForeignKey;
pub use index::Index;
pub use locality_group::{LocalityGroup, StorageKind};
pub use model::{Model, ModelColumn};
pub use named_schema::NamedSchema;
pub use placement::Placement;
pub use property_graph::PropertyGraph;
pub use sequence::{Sequence, SequenceKind};
pub use table::Table;
pub use view::{SqlSecurity, Udf, UdfParameter, View};

/// One column of a primary or index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColumn {
    pub column: NodeId,
    pub descending: bool,
    pub nulls_last: bool,
}

impl KeyColumn {
    pub fn ascending(column: NodeId) -> Self {
        Self {
            column,
            descending: false,
            nulls_last: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDeleteAction {
    #[default]
    NoAction,
    Cascade,
}

impl OnDeleteAction {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDeleteAction::NoAction => "NO ACTION",
            OnDeleteAction::Cascade => "CASCADE",
        }
    }
}

/// `ROW DELETION POLICY (OLDER_THAN(column, INTERVAL n DAY))`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDeletionPolicy {
    pub column: String,
    pub older_than_days: i64,
}
