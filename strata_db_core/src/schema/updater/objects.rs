use crate::error::{Error, Result};
use crate::schema::catalog::locality_group::DEFAULT_LOCALITY_GROUP;
use crate::schema::catalog::{
    ChangeStream, ChangeStreamFor, DatabaseOptions, LocalityGroup, Model, NamedSchema, Placement,
    PropertyGraph, Sequence, TrackedTable, Udf, View,
};
use crate::schema::context::SchemaChangeAction;
use crate::schema::ddl::{
    AlterChangeStream, AlterDatabase, AlterLocalityGroup, AlterSequence, ChangeStreamForDef,
    ChangeStreamOptions, CreateChangeStream, CreateFunction, CreateLocalityGroup, CreateModel,
    CreatePlacement, CreatePropertyGraph, CreateSchema, CreateSequence, CreateView, DropObject,
};
use crate::schema::graph::NodeId;

use super::Updater;

fn not_found(kind: &str, stmt: &DropObject) -> Result<()> {
    if stmt.if_exists {
        Ok(())
    } else {
        Err(Error::schema(format!("{kind} not found: {}", stmt.name)))
    }
}

fn apply_options(stream: &mut ChangeStream, options: &ChangeStreamOptions) {
    if let Some(value) = &options.value_capture_type {
        stream.value_capture_type = Some(value.clone());
    }
    if let Some(value) = &options.retention_period {
        stream.retention_period = Some(value.clone());
    }
    stream.exclude_insert = options.exclude_insert.or(stream.exclude_insert);
    stream.exclude_update = options.exclude_update.or(stream.exclude_update);
    stream.exclude_delete = options.exclude_delete.or(stream.exclude_delete);
    stream.exclude_ttl_deletes = options.exclude_ttl_deletes.or(stream.exclude_ttl_deletes);
}

impl Updater<'_> {
    pub(super) fn create_named_schema(&mut self, stmt: &CreateSchema) -> Result<()> {
        if self.base.find_named_schema(&stmt.name).is_some() {
            if stmt.if_not_exists {
                return Ok(());
            }
            return Err(Error::schema(format!("Schema {} already exists.", stmt.name)));
        }
        let id = self.editor.allocate_id();
        self.editor.add_node(NamedSchema {
            id,
            name: stmt.name.clone(),
        });
        Ok(())
    }

    pub(super) fn drop_named_schema(&mut self, stmt: &DropObject) -> Result<()> {
        let Some(schema) = self.base.find_named_schema(&stmt.name) else {
            return not_found("Schema", stmt);
        };
        let prefix = format!("{}.", schema.name.to_lowercase());
        let contained: Vec<&str> = self
            .base
            .graph()
            .iter()
            .map(|node| node.name())
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .collect();
        if !contained.is_empty() {
            return Err(Error::schema(format!(
                "Cannot drop schema {} because it contains {}.",
                schema.name,
                contained.join(", ")
            )));
        }
        self.editor.delete_node(schema.id)
    }

    pub(super) fn create_sequence(&mut self, stmt: &CreateSequence) -> Result<()> {
        if stmt.if_not_exists && self.base.find_sequence(&stmt.name, true).is_some() {
            return Ok(());
        }
        let (kind, uses_default_kind) = self.sequence_kind(stmt.kind);
        let id = self.editor.allocate_id();
        self.editor.add_node(Sequence {
            id,
            name: stmt.name.clone(),
            kind,
            uses_default_kind,
            start_with_counter: stmt.start_with_counter,
            skip_range: stmt.skip_range,
            internal: false,
        });
        Ok(())
    }

    pub(super) fn alter_sequence(&mut self, stmt: &AlterSequence) -> Result<()> {
        let sequence = self
            .base
            .find_sequence(&stmt.name, true)
            .ok_or_else(|| Error::schema(format!("Sequence not found: {}", stmt.name)))?;
        let id = sequence.id;
        if let Some(counter) = stmt
            .start_with_counter
            .filter(|c| Some(*c) != sequence.start_with_counter)
        {
            self.extra_actions.push(SchemaChangeAction::RestartSequence {
                sequence: id,
                counter,
            });
        }
        self.editor.edit_node::<Sequence>(id, |s| {
            if let Some(kind) = stmt.kind {
                s.kind = kind;
                s.uses_default_kind = false;
            }
            if let Some(counter) = stmt.start_with_counter {
                s.start_with_counter = Some(counter);
            }
            if stmt.clear_skip_range {
                s.skip_range = None;
            } else if let Some(range) = stmt.skip_range {
                s.skip_range = Some(range);
            }
            Ok(())
        })
    }

    pub(super) fn drop_sequence(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_sequence(&stmt.name, true) {
            Some(sequence) => self.editor.delete_node(sequence.id),
            None => not_found("Sequence", stmt),
        }
    }

    // Tables, views and functions a view or function body reads.
    fn resolve_dependencies(&self, names: &[String]) -> Result<Vec<NodeId>> {
        names
            .iter()
            .map(|name| {
                self.base
                    .find_table(name)
                    .map(|t| t.id)
                    .or_else(|| self.base.find_view(name).map(|v| v.id))
                    .or_else(|| self.base.find_udf(name).map(|u| u.id))
                    .ok_or_else(|| Error::schema(format!("Table or view not found: {name}")))
            })
            .collect()
    }

    pub(super) fn create_view(&mut self, stmt: &CreateView) -> Result<()> {
        let dependencies = self.resolve_dependencies(&stmt.dependencies)?;
        if let Some(existing) = self.base.find_view(&stmt.name) {
            if !stmt.or_replace {
                return Err(Error::schema(format!("Duplicate name in schema: {}.", stmt.name)));
            }
            return self.editor.edit_node::<View>(existing.id, |v| {
                v.security = stmt.security;
                v.body = stmt.body.clone();
                v.dependencies = dependencies;
                Ok(())
            });
        }
        let id = self.editor.allocate_id();
        self.editor.add_node(View {
            id,
            name: stmt.name.clone(),
            security: stmt.security,
            body: stmt.body.clone(),
            dependencies,
        });
        Ok(())
    }

    pub(super) fn drop_view(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_view(&stmt.name) {
            Some(view) => self.editor.delete_node(view.id),
            None => not_found("View", stmt),
        }
    }

    pub(super) fn create_function(&mut self, stmt: &CreateFunction) -> Result<()> {
        let dependencies = self.resolve_dependencies(&stmt.dependencies)?;
        if let Some(existing) = self.base.find_udf(&stmt.name) {
            if !stmt.or_replace {
                return Err(Error::schema(format!("Duplicate name in schema: {}.", stmt.name)));
            }
            return self.editor.edit_node::<Udf>(existing.id, |f| {
                f.parameters = stmt.parameters.clone();
                f.return_type = stmt.return_type.clone();
                f.security = stmt.security;
                f.body = stmt.body.clone();
                f.dependencies = dependencies;
                Ok(())
            });
        }
        let id = self.editor.allocate_id();
        self.editor.add_node(Udf {
            id,
            name: stmt.name.clone(),
            parameters: stmt.parameters.clone(),
            return_type: stmt.return_type.clone(),
            security: stmt.security,
            body: stmt.body.clone(),
            dependencies,
        });
        Ok(())
    }

    pub(super) fn drop_function(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_udf(&stmt.name) {
            Some(udf) => self.editor.delete_node(udf.id),
            None => not_found("Function", stmt),
        }
    }

    fn resolve_for_clause(&self, clause: &ChangeStreamForDef) -> Result<ChangeStreamFor> {
        Ok(match clause {
            ChangeStreamForDef::All => ChangeStreamFor::All,
            ChangeStreamForDef::Tables(tables) => {
                let mut tracked = Vec::with_capacity(tables.len());
                for def in tables {
                    let table = self.base_table(&def.table)?.id;
                    let columns = match &def.columns {
                        Some(names) => Some(self.column_ids(table, names)?),
                        None => None,
                    };
                    tracked.push(TrackedTable { table, columns });
                }
                ChangeStreamFor::Tables(tracked)
            }
        })
    }

    pub(super) fn create_change_stream(&mut self, stmt: &CreateChangeStream) -> Result<()> {
        let for_clause = stmt
            .for_clause
            .as_ref()
            .map(|clause| self.resolve_for_clause(clause))
            .transpose()?;
        let mut stream = ChangeStream {
            id: self.editor.allocate_id(),
            name: stmt.name.clone(),
            for_clause,
            value_capture_type: None,
            retention_period: None,
            exclude_insert: None,
            exclude_update: None,
            exclude_delete: None,
            exclude_ttl_deletes: None,
        };
        apply_options(&mut stream, &stmt.options);
        self.editor.add_node(stream);
        Ok(())
    }

    pub(super) fn alter_change_stream(&mut self, stmt: &AlterChangeStream) -> Result<()> {
        let id = self
            .base
            .find_change_stream(&stmt.name)
            .map(|s| s.id)
            .ok_or_else(|| Error::schema(format!("Change Stream not found: {}", stmt.name)))?;
        let for_clause = stmt
            .set_for
            .as_ref()
            .map(|clause| self.resolve_for_clause(clause))
            .transpose()?;
        self.editor.edit_node::<ChangeStream>(id, |stream| {
            if stmt.drop_for_all {
                stream.for_clause = None;
            } else if for_clause.is_some() {
                stream.for_clause = for_clause;
            }
            if let Some(options) = &stmt.set_options {
                apply_options(stream, options);
            }
            Ok(())
        })
    }

    pub(super) fn drop_change_stream(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_change_stream(&stmt.name) {
            Some(stream) => self.editor.delete_node(stream.id),
            None => not_found("Change Stream", stmt),
        }
    }

    pub(super) fn create_model(&mut self, stmt: &CreateModel) -> Result<()> {
        let model = |id| Model {
            id,
            name: stmt.name.clone(),
            remote: stmt.remote,
            input: stmt.input.clone(),
            output: stmt.output.clone(),
            endpoint: stmt.endpoint.clone(),
            endpoints: stmt.endpoints.clone(),
            default_batch_size: stmt.default_batch_size,
        };
        if let Some(existing) = self.base.find_model(&stmt.name) {
            if stmt.if_not_exists {
                return Ok(());
            }
            if !stmt.or_replace {
                return Err(Error::schema(format!("Duplicate name in schema: {}.", stmt.name)));
            }
            let replacement = model(existing.id);
            return self.editor.edit_node::<Model>(existing.id, |m| {
                *m = replacement;
                Ok(())
            });
        }
        let id = self.editor.allocate_id();
        self.editor.add_node(model(id));
        Ok(())
    }

    pub(super) fn drop_model(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_model(&stmt.name) {
            Some(model) => self.editor.delete_node(model.id),
            None => not_found("Model", stmt),
        }
    }

    pub(super) fn create_property_graph(&mut self, stmt: &CreatePropertyGraph) -> Result<()> {
        let resolve = |names: &[String]| -> Result<Vec<NodeId>> {
            names
                .iter()
                .map(|name| self.base_table(name).map(|t| t.id))
                .collect()
        };
        let node_tables = resolve(&stmt.node_tables)?;
        let edge_tables = resolve(&stmt.edge_tables)?;
        if let Some(existing) = self.base.find_property_graph(&stmt.name) {
            if !stmt.or_replace {
                return Err(Error::schema(format!("Duplicate name in schema: {}.", stmt.name)));
            }
            return self.editor.edit_node::<PropertyGraph>(existing.id, |g| {
                g.node_tables = node_tables;
                g.edge_tables = edge_tables;
                g.ddl_body = stmt.ddl_body.clone();
                Ok(())
            });
        }
        let id = self.editor.allocate_id();
        self.editor.add_node(PropertyGraph {
            id,
            name: stmt.name.clone(),
            node_tables,
            edge_tables,
            ddl_body: stmt.ddl_body.clone(),
        });
        Ok(())
    }

    pub(super) fn drop_property_graph(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_property_graph(&stmt.name) {
            Some(graph) => self.editor.delete_node(graph.id),
            None => not_found("Property Graph", stmt),
        }
    }

    pub(super) fn alter_database(&mut self, stmt: &AlterDatabase) -> Result<()> {
        let set = |options: &mut DatabaseOptions| {
            options.name = stmt.name.clone();
            let fields = [
                (&mut options.default_time_zone, &stmt.default_time_zone),
                (&mut options.default_sequence_kind, &stmt.default_sequence_kind),
                (&mut options.version_retention_period, &stmt.version_retention_period),
                (&mut options.optimizer_version, &stmt.optimizer_version),
                (&mut options.witness_location, &stmt.witness_location),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    // An empty value resets the option.
                    *field = (!value.is_empty()).then(|| value.clone());
                }
            }
        };
        match self.base.database_options() {
            Some(existing) => self.editor.edit_node::<DatabaseOptions>(existing.id, |options| {
                set(options);
                Ok(())
            }),
            None => {
                let mut options = DatabaseOptions {
                    id: self.editor.allocate_id(),
                    ..DatabaseOptions::default()
                };
                set(&mut options);
                self.editor.add_node(options);
                Ok(())
            }
        }
    }

    pub(super) fn create_locality_group(&mut self, stmt: &CreateLocalityGroup) -> Result<()> {
        let id = self.editor.allocate_id();
        self.editor.add_node(LocalityGroup {
            id,
            name: stmt.name.clone(),
            storage: stmt.storage,
            ssd_to_hdd_spill_timespans: stmt.ssd_to_hdd_spill_timespans.clone(),
        });
        Ok(())
    }

    pub(super) fn alter_locality_group(&mut self, stmt: &AlterLocalityGroup) -> Result<()> {
        let apply = |group: &mut LocalityGroup| {
            if let Some(storage) = stmt.storage {
                group.storage = Some(storage);
            }
            if let Some(spans) = &stmt.ssd_to_hdd_spill_timespans {
                group.ssd_to_hdd_spill_timespans = spans.clone();
            }
        };
        match self.base.find_locality_group(&stmt.name) {
            Some(existing) => self.editor.edit_node::<LocalityGroup>(existing.id, |group| {
                apply(group);
                Ok(())
            }),
            // The default group exists implicitly until it is first altered.
            None if stmt.name.eq_ignore_ascii_case(DEFAULT_LOCALITY_GROUP) => {
                let mut group = LocalityGroup {
                    id: self.editor.allocate_id(),
                    name: DEFAULT_LOCALITY_GROUP.to_string(),
                    storage: None,
                    ssd_to_hdd_spill_timespans: Vec::new(),
                };
                apply(&mut group);
                self.editor.add_node(group);
                Ok(())
            }
            None => Err(Error::schema(format!(
                "Locality group not found: {}",
                stmt.name
            ))),
        }
    }

    pub(super) fn drop_locality_group(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_locality_group(&stmt.name) {
            Some(group) => self.editor.delete_node(group.id),
            None => not_found("Locality group", stmt),
        }
    }

    pub(super) fn create_placement(&mut self, stmt: &CreatePlacement) -> Result<()> {
        let id = self.editor.allocate_id();
        self.editor.add_node(Placement {
            id,
            name: stmt.name.clone(),
            instance_partition: stmt.instance_partition.clone(),
            default_leader: stmt.default_leader.clone(),
        });
        Ok(())
    }

    pub(super) fn drop_placement(&mut self, stmt: &DropObject) -> Result<()> {
        match self.base.find_placement(&stmt.name) {
            Some(placement) => self.editor.delete_node(placement.id),
            None => not_found("Placement", stmt),
        }
    }
}
