use super::catalog::locality_group::DEFAULT_LOCALITY_GROUP;
use super::catalog::{
    ChangeStream, ChangeStreamFor, CheckConstraint, Column, ForeignKey, Index, KeyColumn,
    LocalityGroup, Sequence, Table,
};
use super::ddl::{
    AlterDatabase, AlterLocalityGroup, AlterTable, AlterTableAction, ChangeStreamForDef,
    ChangeStreamOptions, CheckDef, ColumnDef, CreateChangeStream, CreateFunction, CreateIndex,
    CreateLocalityGroup, CreateModel, CreatePlacement, CreatePropertyGraph, CreateSchema,
    CreateSequence, CreateTable, CreateView, DdlStatement, ForeignKeyDef, GeneratedDef,
    IdentityDef, InterleaveDef, KeyPart, TrackedTableDef,
};
use super::facade::Schema;
use super::graph::NodeId;
use super::node::SchemaNode;

impl Schema {
    /// Reconstructs the statements that rebuild this schema.
    ///
    /// Statements only refer to objects declared before them, so replaying
    /// the list in order against an empty schema is valid. Foreign keys to
    /// tables declared later and table locality groups are emitted as
    /// trailing `ALTER TABLE` statements.
    pub fn dump(&self) -> Vec<DdlStatement> {
        let mut out = Vec::new();
        let mut trailing = Vec::new();

        for named_schema in self.named_schemas() {
            out.push(DdlStatement::CreateSchema(CreateSchema {
                name: named_schema.name.clone(),
                if_not_exists: false,
            }));
        }

        for sequence in self.sequences().filter(|s| !s.internal) {
            out.push(DdlStatement::CreateSequence(CreateSequence {
                name: sequence.name.clone(),
                kind: (!sequence.uses_default_kind).then_some(sequence.kind),
                start_with_counter: sequence.start_with_counter,
                skip_range: sequence.skip_range,
                if_not_exists: false,
            }));
        }

        for table in self.tables() {
            out.push(DdlStatement::CreateTable(self.dump_table(table, &mut trailing)));
            if let Some(group) = table
                .locality_group
                .and_then(|id| self.get::<LocalityGroup>(id))
            {
                trailing.push(DdlStatement::AlterTable(AlterTable {
                    table: table.name.clone(),
                    action: AlterTableAction::SetLocalityGroup {
                        locality_group: Some(group.name.clone()),
                    },
                }));
            }
        }

        for index in self.indexes().filter(|i| !i.is_managed()) {
            out.push(DdlStatement::CreateIndex(self.dump_index(index)));
        }

        for model in self.models() {
            out.push(DdlStatement::CreateModel(CreateModel {
                name: model.name.clone(),
                input: model.input.clone(),
                output: model.output.clone(),
                remote: model.remote,
                endpoint: model.endpoint.clone(),
                endpoints: model.endpoints.clone(),
                default_batch_size: model.default_batch_size,
                or_replace: false,
                if_not_exists: false,
            }));
        }

        for graph in self.property_graphs() {
            out.push(DdlStatement::CreatePropertyGraph(CreatePropertyGraph {
                name: graph.name.clone(),
                node_tables: self.names_of(&graph.node_tables),
                edge_tables: self.names_of(&graph.edge_tables),
                ddl_body: graph.ddl_body.clone(),
                or_replace: false,
            }));
        }

        // Views and functions may depend on each other; creation order
        // keeps dependencies first.
        for node in self.graph().iter() {
            match node {
                SchemaNode::View(view) => out.push(DdlStatement::CreateView(CreateView {
                    name: view.name.clone(),
                    security: view.security,
                    body: view.body.clone(),
                    dependencies: self.names_of(&view.dependencies),
                    or_replace: false,
                })),
                SchemaNode::Udf(udf) => out.push(DdlStatement::CreateFunction(CreateFunction {
                    name: udf.name.clone(),
                    parameters: udf.parameters.clone(),
                    return_type: udf.return_type.clone(),
                    security: udf.security,
                    body: udf.body.clone(),
                    dependencies: self.names_of(&udf.dependencies),
                    or_replace: false,
                })),
                _ => {}
            }
        }

        for stream in self.change_streams() {
            out.push(DdlStatement::CreateChangeStream(self.dump_change_stream(stream)));
        }

        if let Some(options) = self.database_options() {
            if !options.entries().is_empty() {
                out.push(DdlStatement::AlterDatabase(AlterDatabase {
                    name: options.name.clone(),
                    default_time_zone: options.default_time_zone.clone(),
                    default_sequence_kind: options.default_sequence_kind.clone(),
                    version_retention_period: options.version_retention_period.clone(),
                    optimizer_version: options.optimizer_version.clone(),
                    witness_location: options.witness_location.clone(),
                }));
            }
        }

        for group in self.locality_groups() {
            if group.name.eq_ignore_ascii_case(DEFAULT_LOCALITY_GROUP) {
                out.push(DdlStatement::AlterLocalityGroup(AlterLocalityGroup {
                    name: group.name.clone(),
                    storage: group.storage,
                    ssd_to_hdd_spill_timespans: Some(group.ssd_to_hdd_spill_timespans.clone()),
                }));
            } else {
                out.push(DdlStatement::CreateLocalityGroup(CreateLocalityGroup {
                    name: group.name.clone(),
                    storage: group.storage,
                    ssd_to_hdd_spill_timespans: group.ssd_to_hdd_spill_timespans.clone(),
                }));
            }
        }

        for placement in self.placements() {
            out.push(DdlStatement::CreatePlacement(CreatePlacement {
                name: placement.name.clone(),
                instance_partition: placement.instance_partition.clone(),
                default_leader: placement.default_leader.clone(),
            }));
        }

        out.extend(trailing);
        out
    }

    fn names_of(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.graph().get(*id))
            .map(|node| node.name().to_string())
            .collect()
    }

    fn column_name(&self, id: NodeId) -> String {
        self.get::<Column>(id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn key_parts(&self, keys: &[KeyColumn]) -> Vec<KeyPart> {
        keys.iter()
            .map(|k| KeyPart {
                column: self.column_name(k.column),
                descending: k.descending,
                nulls_last: k.nulls_last,
            })
            .collect()
    }

    fn dump_column(&self, column: &Column) -> ColumnDef {
        let identity = column
            .identity_sequence
            .and_then(|id| self.get::<Sequence>(id))
            .map(|seq| IdentityDef {
                kind: (!seq.uses_default_kind).then_some(seq.kind),
                start_with_counter: seq.start_with_counter,
                skip_range: seq.skip_range,
            });
        ColumnDef {
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            length: column.max_length,
            not_null: !column.nullable,
            default: column.default_value.as_ref().map(|e| e.text().to_string()),
            generated: column.generated.as_ref().map(|g| GeneratedDef {
                expression: g.expression.text().to_string(),
                stored: g.stored,
            }),
            identity,
            allow_commit_timestamp: column.allows_commit_timestamp,
            placement_key: column.placement_key,
            hidden: column.hidden,
        }
    }

    fn dump_foreign_key(&self, fk: &ForeignKey) -> ForeignKeyDef {
        ForeignKeyDef {
            name: (!fk.generated_name).then(|| fk.name.clone()),
            columns: fk.referencing_columns.iter().map(|c| self.column_name(*c)).collect(),
            referenced_table: self
                .get::<Table>(fk.referenced_table)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            referenced_columns: fk.referenced_columns.iter().map(|c| self.column_name(*c)).collect(),
            on_delete: fk.on_delete,
            enforced: fk.enforced,
        }
    }

    fn dump_table(&self, table: &Table, trailing: &mut Vec<DdlStatement>) -> CreateTable {
        let mut foreign_keys = Vec::new();
        for fk in table.foreign_keys.iter().filter_map(|id| self.get::<ForeignKey>(*id)) {
            let def = self.dump_foreign_key(fk);
            if fk.referenced_table <= table.id {
                foreign_keys.push(def);
            } else {
                trailing.push(DdlStatement::AlterTable(AlterTable {
                    table: table.name.clone(),
                    action: AlterTableAction::AddForeignKey { foreign_key: def },
                }));
            }
        }

        let checks: Vec<&CheckConstraint> = table
            .check_constraints
            .iter()
            .filter_map(|id| self.get(*id))
            .collect();
        let check_constraints = checks
            .iter()
            .filter(|c| c.generated_name)
            .chain(checks.iter().filter(|c| !c.generated_name))
            .map(|c| CheckDef {
                name: (!c.generated_name).then(|| c.name.clone()),
                expression: c.expression.text().to_string(),
            })
            .collect();

        CreateTable {
            name: table.name.clone(),
            columns: self
                .table_columns(table)
                .into_iter()
                .map(|c| self.dump_column(c))
                .collect(),
            primary_key: self.key_parts(&table.primary_key),
            foreign_keys,
            check_constraints,
            interleave_in_parent: table
                .parent
                .and_then(|id| self.get::<Table>(id))
                .map(|parent| InterleaveDef {
                    parent: parent.name.clone(),
                    on_delete: table.on_delete,
                }),
            row_deletion_policy: table.row_deletion_policy.clone(),
            synonym: table.synonym.clone(),
            locality_group: None,
            if_not_exists: false,
        }
    }

    fn dump_index(&self, index: &Index) -> CreateIndex {
        CreateIndex {
            name: index.name.clone(),
            table: self
                .get::<Table>(index.table)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            key: self.key_parts(&index.key_columns),
            storing: index.stored_columns.iter().map(|c| self.column_name(*c)).collect(),
            unique: index.unique,
            null_filtered: index.null_filtered,
            interleave_in: index
                .parent
                .and_then(|id| self.get::<Table>(id))
                .map(|t| t.name.clone()),
            if_not_exists: false,
        }
    }

    fn dump_change_stream(&self, stream: &ChangeStream) -> CreateChangeStream {
        let for_clause = stream.for_clause.as_ref().map(|clause| match clause {
            ChangeStreamFor::All => ChangeStreamForDef::All,
            ChangeStreamFor::Tables(tables) => ChangeStreamForDef::Tables(
                tables
                    .iter()
                    .map(|tracked| TrackedTableDef {
                        table: self
                            .get::<Table>(tracked.table)
                            .map(|t| t.name.clone())
                            .unwrap_or_default(),
                        columns: tracked
                            .columns
                            .as_ref()
                            .map(|cols| cols.iter().map(|c| self.column_name(*c)).collect()),
                    })
                    .collect(),
            ),
        });
        CreateChangeStream {
            name: stream.name.clone(),
            for_clause,
            options: ChangeStreamOptions {
                value_capture_type: stream.value_capture_type.clone(),
                retention_period: stream.retention_period.clone(),
                exclude_insert: stream.exclude_insert,
                exclude_update: stream.exclude_update,
                exclude_delete: stream.exclude_delete,
                exclude_ttl_deletes: stream.exclude_ttl_deletes,
            },
        }
    }
}
