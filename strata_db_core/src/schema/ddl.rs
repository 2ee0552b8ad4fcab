//! Structured DDL statements.
//!
//! These records carry everything a schema change needs; they are what the
//! updater consumes and what [`Schema::dump`](super::Schema::dump) produces.
//! All of them round-trip through serde JSON.

use serde::{Deserialize, Serialize};

use crate::types::datatype::DataType;

use super::catalog::{
    ModelColumn, OnDeleteAction, RowDeletionPolicy, SequenceKind, SqlSecurity, StorageKind,
    UdfParameter,
};

fn yes() -> bool {
    true
}

/// One part of a primary or index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
    #[serde(default)]
    pub nulls_last: bool,
}

impl KeyPart {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
            nulls_last: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
            nulls_last: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDef {
    pub expression: String,
    #[serde(default)]
    pub stored: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDef {
    #[serde(default)]
    pub kind: Option<SequenceKind>,
    #[serde(default)]
    pub start_with_counter: Option<i64>,
    #[serde(default)]
    pub skip_range: Option<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub length: Option<i64>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub generated: Option<GeneratedDef>,
    #[serde(default)]
    pub identity: Option<IdentityDef>,
    #[serde(default)]
    pub allow_commit_timestamp: bool,
    #[serde(default)]
    pub placement_key: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            length: None,
            not_null: false,
            default: None,
            generated: None,
            identity: None,
            allow_commit_timestamp: false,
            placement_key: false,
            hidden: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn default_value(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    pub fn generated(mut self, expression: impl Into<String>, stored: bool) -> Self {
        self.generated = Some(GeneratedDef {
            expression: expression.into(),
            stored,
        });
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = Some(IdentityDef::default());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name; a name is generated when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: OnDeleteAction,
    #[serde(default = "yes")]
    pub enforced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDef {
    #[serde(default)]
    pub name: Option<String>,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaveDef {
    pub parent: String,
    #[serde(default)]
    pub on_delete: OnDeleteAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<KeyPart>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDef>,
    #[serde(default)]
    pub check_constraints: Vec<CheckDef>,
    #[serde(default)]
    pub interleave_in_parent: Option<InterleaveDef>,
    #[serde(default)]
    pub row_deletion_policy: Option<RowDeletionPolicy>,
    #[serde(default)]
    pub synonym: Option<String>,
    #[serde(default)]
    pub locality_group: Option<String>,
    #[serde(default)]
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AlterTableAction {
    AddColumn {
        column: ColumnDef,
        #[serde(default)]
        if_not_exists: bool,
    },
    DropColumn {
        column: String,
    },
    /// Replaces a column definition. The type may not change.
    AlterColumn {
        column: ColumnDef,
    },
    AddForeignKey {
        foreign_key: ForeignKeyDef,
    },
    AddCheckConstraint {
        check: CheckDef,
    },
    DropConstraint {
        name: String,
    },
    SetOnDelete {
        on_delete: OnDeleteAction,
    },
    AddRowDeletionPolicy {
        policy: RowDeletionPolicy,
    },
    ReplaceRowDeletionPolicy {
        policy: RowDeletionPolicy,
    },
    DropRowDeletionPolicy,
    /// Renames the table, optionally keeping the old name as a synonym.
    RenameTo {
        new_name: String,
        #[serde(default)]
        synonym: Option<String>,
    },
    AddSynonym {
        synonym: String,
    },
    DropSynonym {
        synonym: String,
    },
    SetLocalityGroup {
        locality_group: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterTable {
    pub table: String,
    #[serde(flatten)]
    pub action: AlterTableAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndex {
    pub name: String,
    pub table: String,
    pub key: Vec<KeyPart>,
    #[serde(default)]
    pub storing: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub null_filtered: bool,
    #[serde(default)]
    pub interleave_in: Option<String>,
    #[serde(default)]
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSequence {
    pub name: String,
    #[serde(default)]
    pub kind: Option<SequenceKind>,
    #[serde(default)]
    pub start_with_counter: Option<i64>,
    #[serde(default)]
    pub skip_range: Option<(i64, i64)>,
    #[serde(default)]
    pub if_not_exists: bool,
}

/// Only the options that are present are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterSequence {
    pub name: String,
    #[serde(default)]
    pub kind: Option<SequenceKind>,
    #[serde(default)]
    pub start_with_counter: Option<i64>,
    #[serde(default)]
    pub skip_range: Option<(i64, i64)>,
    #[serde(default)]
    pub clear_skip_range: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateView {
    pub name: String,
    #[serde(default)]
    pub security: SqlSecurity,
    pub body: String,
    /// Tables, views and functions read by the body.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFunction {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<UdfParameter>,
    #[serde(default)]
    pub return_type: Option<DataType>,
    #[serde(default)]
    pub security: SqlSecurity,
    pub body: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub or_replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTableDef {
    pub table: String,
    /// `None` tracks all columns.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStreamForDef {
    All,
    Tables(Vec<TrackedTableDef>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStreamOptions {
    #[serde(default)]
    pub value_capture_type: Option<String>,
    #[serde(default)]
    pub retention_period: Option<String>,
    #[serde(default)]
    pub exclude_insert: Option<bool>,
    #[serde(default)]
    pub exclude_update: Option<bool>,
    #[serde(default)]
    pub exclude_delete: Option<bool>,
    #[serde(default)]
    pub exclude_ttl_deletes: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChangeStream {
    pub name: String,
    #[serde(default)]
    pub for_clause: Option<ChangeStreamForDef>,
    #[serde(default)]
    pub options: ChangeStreamOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterChangeStream {
    pub name: String,
    #[serde(default)]
    pub set_for: Option<ChangeStreamForDef>,
    #[serde(default)]
    pub drop_for_all: bool,
    #[serde(default)]
    pub set_options: Option<ChangeStreamOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateModel {
    pub name: String,
    #[serde(default)]
    pub input: Vec<ModelColumn>,
    #[serde(default)]
    pub output: Vec<ModelColumn>,
    #[serde(default = "yes")]
    pub remote: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub default_batch_size: Option<i64>,
    #[serde(default)]
    pub or_replace: bool,
    #[serde(default)]
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePropertyGraph {
    pub name: String,
    pub node_tables: Vec<String>,
    #[serde(default)]
    pub edge_tables: Vec<String>,
    pub ddl_body: String,
    #[serde(default)]
    pub or_replace: bool,
}

/// `ALTER DATABASE ... SET OPTIONS`. Absent options are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterDatabase {
    pub name: String,
    #[serde(default)]
    pub default_time_zone: Option<String>,
    #[serde(default)]
    pub default_sequence_kind: Option<String>,
    #[serde(default)]
    pub version_retention_period: Option<String>,
    #[serde(default)]
    pub optimizer_version: Option<String>,
    #[serde(default)]
    pub witness_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLocalityGroup {
    pub name: String,
    #[serde(default)]
    pub storage: Option<StorageKind>,
    #[serde(default)]
    pub ssd_to_hdd_spill_timespans: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterLocalityGroup {
    pub name: String,
    #[serde(default)]
    pub storage: Option<StorageKind>,
    #[serde(default)]
    pub ssd_to_hdd_spill_timespans: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlacement {
    pub name: String,
    #[serde(default)]
    pub instance_partition: Option<String>,
    #[serde(default)]
    pub default_leader: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSchema {
    pub name: String,
    #[serde(default)]
    pub if_not_exists: bool,
}

/// `DROP <kind> [IF EXISTS] name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropObject {
    pub name: String,
    #[serde(default)]
    pub if_exists: bool,
}

impl DropObject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_exists: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "statement", rename_all = "snake_case")]
pub enum DdlStatement {
    CreateSchema(CreateSchema),
    DropSchema(DropObject),
    CreateSequence(CreateSequence),
    AlterSequence(AlterSequence),
    DropSequence(DropObject),
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    DropTable(DropObject),
    CreateIndex(CreateIndex),
    DropIndex(DropObject),
    CreateModel(CreateModel),
    DropModel(DropObject),
    CreatePropertyGraph(CreatePropertyGraph),
    DropPropertyGraph(DropObject),
    CreateView(CreateView),
    DropView(DropObject),
    CreateFunction(CreateFunction),
    DropFunction(DropObject),
    CreateChangeStream(CreateChangeStream),
    AlterChangeStream(AlterChangeStream),
    DropChangeStream(DropObject),
    AlterDatabase(AlterDatabase),
    CreateLocalityGroup(CreateLocalityGroup),
    AlterLocalityGroup(AlterLocalityGroup),
    DropLocalityGroup(DropObject),
    CreatePlacement(CreatePlacement),
    DropPlacement(DropObject),
}

impl DdlStatement {
    /// Short label for logs, e.g. `create_table Users`.
    pub fn label(&self) -> String {
        let (verb, name) = match self {
            DdlStatement::CreateSchema(s) => ("create_schema", &s.name),
            DdlStatement::DropSchema(d) => ("drop_schema", &d.name),
            DdlStatement::CreateSequence(s) => ("create_sequence", &s.name),
            DdlStatement::AlterSequence(s) => ("alter_sequence", &s.name),
            DdlStatement::DropSequence(d) => ("drop_sequence", &d.name),
            DdlStatement::CreateTable(t) => ("create_table", &t.name),
            DdlStatement::AlterTable(t) => ("alter_table", &t.table),
            DdlStatement::DropTable(d) => ("drop_table", &d.name),
            DdlStatement::CreateIndex(i) => ("create_index", &i.name),
            DdlStatement::DropIndex(d) => ("drop_index", &d.name),
            DdlStatement::CreateModel(m) => ("create_model", &m.name),
            DdlStatement::DropModel(d) => ("drop_model", &d.name),
            DdlStatement::CreatePropertyGraph(g) => ("create_property_graph", &g.name),
            DdlStatement::DropPropertyGraph(d) => ("drop_property_graph", &d.name),
            DdlStatement::CreateView(v) => ("create_view", &v.name),
            DdlStatement::DropView(d) => ("drop_view", &d.name),
            DdlStatement::CreateFunction(f) => ("create_function", &f.name),
            DdlStatement::DropFunction(d) => ("drop_function", &d.name),
            DdlStatement::CreateChangeStream(c) => ("create_change_stream", &c.name),
            DdlStatement::AlterChangeStream(c) => ("alter_change_stream", &c.name),
            DdlStatement::DropChangeStream(d) => ("drop_change_stream", &d.name),
            DdlStatement::AlterDatabase(a) => ("alter_database", &a.name),
            DdlStatement::CreateLocalityGroup(l) => ("create_locality_group", &l.name),
            DdlStatement::AlterLocalityGroup(l) => ("alter_locality_group", &l.name),
            DdlStatement::DropLocalityGroup(d) => ("drop_locality_group", &d.name),
            DdlStatement::CreatePlacement(p) => ("create_placement", &p.name),
            DdlStatement::DropPlacement(d) => ("drop_placement", &d.name),
        };
        format!("{verb} {name}")
    }
}
