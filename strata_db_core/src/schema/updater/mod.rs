//! Applies DDL statements to a schema, producing the next version.
//!
//! Each statement runs against its own [`SchemaGraphEditor`]; the base
//! schema is never modified and a failed statement leaves no trace.

mod index;
mod objects;
mod table;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::schema::catalog::{Column, Table};
use crate::schema::context::SchemaChangeAction;
use crate::schema::ddl::DdlStatement;
use crate::schema::editor::SchemaGraphEditor;
use crate::schema::facade::{Schema, SchemaVersion};
use crate::schema::graph::NodeId;
use crate::schema::names::split_schema_name;

pub use index::managed_index_name;

/// Result of applying one statement: the new schema and the work that
/// must run against existing data before the schema can be published.
#[derive(Debug)]
pub struct SchemaChange {
    pub schema: Schema,
    pub actions: Vec<SchemaChangeAction>,
}

pub struct SchemaUpdater;

impl SchemaUpdater {
    pub fn apply(
        base: &Schema,
        statement: &DdlStatement,
        version: SchemaVersion,
    ) -> Result<SchemaChange> {
        let result = Self::build(base, statement, version);
        match &result {
            Ok(change) => debug!(
                statement = %statement.label(),
                %version,
                actions = change.actions.len(),
                "applied schema change"
            ),
            Err(err) => warn!(statement = %statement.label(), error = %err, "rejected schema change"),
        }
        result
    }

    fn build(base: &Schema, statement: &DdlStatement, version: SchemaVersion) -> Result<SchemaChange> {
        let mut updater = Updater {
            base,
            editor: SchemaGraphEditor::new(base.graph()),
            extra_actions: Vec::new(),
        };
        updater.apply(statement)?;
        let Updater {
            editor,
            extra_actions,
            ..
        } = updater;
        let (graph, mut actions) = editor.build()?;
        for action in extra_actions {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
        Ok(SchemaChange {
            schema: Schema::new(graph, version),
            actions,
        })
    }
}

pub(crate) struct Updater<'a> {
    base: &'a Schema,
    editor: SchemaGraphEditor<'a>,
    extra_actions: Vec<SchemaChangeAction>,
}

impl<'a> Updater<'a> {
    fn apply(&mut self, statement: &DdlStatement) -> Result<()> {
        match statement {
            DdlStatement::CreateSchema(s) => self.create_named_schema(s),
            DdlStatement::DropSchema(d) => self.drop_named_schema(d),
            DdlStatement::CreateSequence(s) => self.create_sequence(s),
            DdlStatement::AlterSequence(s) => self.alter_sequence(s),
            DdlStatement::DropSequence(d) => self.drop_sequence(d),
            DdlStatement::CreateTable(t) => self.create_table(t),
            DdlStatement::AlterTable(t) => self.alter_table(t),
            DdlStatement::DropTable(d) => self.drop_table(d),
            DdlStatement::CreateIndex(i) => self.create_index(i),
            DdlStatement::DropIndex(d) => self.drop_index(d),
            DdlStatement::CreateModel(m) => self.create_model(m),
            DdlStatement::DropModel(d) => self.drop_model(d),
            DdlStatement::CreatePropertyGraph(g) => self.create_property_graph(g),
            DdlStatement::DropPropertyGraph(d) => self.drop_property_graph(d),
            DdlStatement::CreateView(v) => self.create_view(v),
            DdlStatement::DropView(d) => self.drop_view(d),
            DdlStatement::CreateFunction(f) => self.create_function(f),
            DdlStatement::DropFunction(d) => self.drop_function(d),
            DdlStatement::CreateChangeStream(c) => self.create_change_stream(c),
            DdlStatement::AlterChangeStream(c) => self.alter_change_stream(c),
            DdlStatement::DropChangeStream(d) => self.drop_change_stream(d),
            DdlStatement::AlterDatabase(a) => self.alter_database(a),
            DdlStatement::CreateLocalityGroup(l) => self.create_locality_group(l),
            DdlStatement::AlterLocalityGroup(l) => self.alter_locality_group(l),
            DdlStatement::DropLocalityGroup(d) => self.drop_locality_group(d),
            DdlStatement::CreatePlacement(p) => self.create_placement(p),
            DdlStatement::DropPlacement(d) => self.drop_placement(d),
        }
    }

    /// A public table of the base schema, by name or synonym.
    fn base_table(&self, name: &str) -> Result<&'a Table> {
        self.base
            .find_table(name)
            .ok_or_else(|| Error::schema(format!("Table not found: {name}")))
    }

    /// The current state of a table in the graph being edited.
    fn table(&self, id: NodeId) -> Result<&Table> {
        self.editor
            .get_as::<Table>(id)
            .ok_or_else(|| Error::Internal(format!("table {id} disappeared during the edit")))
    }

    fn column_by_name(&self, table: NodeId, name: &str) -> Result<&Column> {
        let table = self.table(table)?;
        table
            .find_column(self.editor.graph(), name)
            .ok_or_else(|| {
                Error::schema(format!("Column not found in table {}: {name}", table.name))
            })
    }

    fn column_ids(&self, table: NodeId, names: &[String]) -> Result<Vec<NodeId>> {
        names
            .iter()
            .map(|name| self.column_by_name(table, name).map(|c| c.id))
            .collect()
    }
}

/// Builds a generated object name in the named schema of `table`.
pub(crate) fn qualify_like(table: &str, object: String) -> String {
    let (schema, _) = split_schema_name(table);
    if schema.is_empty() {
        object
    } else {
        format!("{schema}.{object}")
    }
}

/// FNV-1a over `input`, rendered as 16 upper-case hex digits.
pub(crate) fn fingerprint(input: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let hash = input
        .to_lowercase()
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME));
    hex::encode_upper(hash.to_be_bytes())
}
