use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::catalog::{
    ChangeStream, Column, DatabaseOptions, ForeignKey, Index, LocalityGroup, Model, NamedSchema,
    Placement, PropertyGraph, Sequence, Table, Udf, View,
};
use super::graph::{NodeId, SchemaGraph};
use super::node::{NodeVariant, SchemaNode};

/// Length of the hex fingerprint that ends every managed index name.
pub const FINGERPRINT_LENGTH: usize = 16;

static MANAGED_INDEX_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(IDX_\w+_)[0-9A-F]{16}$").ok());

/// Identity of a published schema version. Versions are handed out in
/// increasing order by the database that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion(pub u64);

impl SchemaVersion {
    pub fn next(self) -> Self {
        SchemaVersion(self.0 + 1)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Entities of one kind, in creation order, with a case-insensitive index.
#[derive(Debug, Default)]
struct NameMap {
    order: Vec<NodeId>,
    by_name: HashMap<String, NodeId>,
}

impl NameMap {
    fn insert(&mut self, name: &str, id: NodeId) {
        self.order.push(id);
        self.by_name.insert(name.to_lowercase(), id);
    }

    fn get(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }
}

/// Name-lookup facade over one immutable schema graph.
#[derive(Debug)]
pub struct Schema {
    version: SchemaVersion,
    graph: SchemaGraph,
    tables: NameMap,
    synonyms: HashMap<String, NodeId>,
    views: NameMap,
    indexes: NameMap,
    change_streams: NameMap,
    placements: NameMap,
    sequences: NameMap,
    models: NameMap,
    property_graphs: NameMap,
    named_schemas: NameMap,
    udfs: NameMap,
    locality_groups: NameMap,
    database_options: Option<NodeId>,
}

impl Schema {
    /// The schema with no entities.
    pub fn empty() -> Self {
        Self::new(SchemaGraph::new(), SchemaVersion(0))
    }

    pub fn new(graph: SchemaGraph, version: SchemaVersion) -> Self {
        let mut schema = Self {
            version,
            graph: SchemaGraph::new(),
            tables: NameMap::default(),
            synonyms: HashMap::new(),
            views: NameMap::default(),
            indexes: NameMap::default(),
            change_streams: NameMap::default(),
            placements: NameMap::default(),
            sequences: NameMap::default(),
            models: NameMap::default(),
            property_graphs: NameMap::default(),
            named_schemas: NameMap::default(),
            udfs: NameMap::default(),
            locality_groups: NameMap::default(),
            database_options: None,
        };
        for node in graph.iter() {
            let id = node.id();
            match node {
                SchemaNode::Table(table) => {
                    if !table.is_public() {
                        continue;
                    }
                    schema.tables.insert(&table.name, id);
                    if let Some(synonym) = &table.synonym {
                        schema.synonyms.insert(synonym.to_lowercase(), id);
                    }
                }
                SchemaNode::Index(index) => schema.indexes.insert(&index.name, id),
                SchemaNode::View(view) => schema.views.insert(&view.name, id),
                SchemaNode::Udf(udf) => schema.udfs.insert(&udf.name, id),
                SchemaNode::ChangeStream(stream) => schema.change_streams.insert(&stream.name, id),
                SchemaNode::Placement(placement) => schema.placements.insert(&placement.name, id),
                SchemaNode::Sequence(sequence) => schema.sequences.insert(&sequence.name, id),
                SchemaNode::Model(model) => schema.models.insert(&model.name, id),
                SchemaNode::PropertyGraph(pg) => schema.property_graphs.insert(&pg.name, id),
                SchemaNode::NamedSchema(ns) => schema.named_schemas.insert(&ns.name, id),
                SchemaNode::LocalityGroup(group) => schema.locality_groups.insert(&group.name, id),
                SchemaNode::DatabaseOptions(_) => schema.database_options = Some(id),
                SchemaNode::Column(_)
                | SchemaNode::ForeignKey(_)
                | SchemaNode::CheckConstraint(_) => {}
            }
        }
        schema.graph = graph;
        schema
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn get<T: NodeVariant>(&self, id: NodeId) -> Option<&T> {
        self.graph.get_as::<T>(id)
    }

    fn resolve<T: NodeVariant>(&self, id: Option<NodeId>) -> Option<&T> {
        id.and_then(|id| self.graph.get_as::<T>(id))
    }

    fn list<'a, T: NodeVariant>(&'a self, map: &'a NameMap) -> impl Iterator<Item = &'a T> + 'a {
        map.order.iter().filter_map(|id| self.graph.get_as::<T>(*id))
    }

    // ---- tables ----

    /// Public tables in creation order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.list(&self.tables)
    }

    /// Case-insensitive lookup that falls back to synonyms.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.resolve(self.tables.get(name))
            .or_else(|| self.find_table_using_synonym(name))
    }

    pub fn find_table_case_sensitive(&self, name: &str) -> Option<&Table> {
        match self.find_table(name) {
            Some(table) if table.name == name => Some(table),
            _ => self.find_table_using_synonym_case_sensitive(name),
        }
    }

    pub fn find_table_using_synonym(&self, synonym: &str) -> Option<&Table> {
        self.resolve(self.synonyms.get(&synonym.to_lowercase()).copied())
    }

    pub fn find_table_using_synonym_case_sensitive(&self, synonym: &str) -> Option<&Table> {
        self.find_table_using_synonym(synonym)
            .filter(|table| table.synonym.as_deref() == Some(synonym))
    }

    // ---- views and functions ----

    pub fn views(&self) -> impl Iterator<Item = &View> + '_ {
        self.list(&self.views)
    }

    pub fn find_view(&self, name: &str) -> Option<&View> {
        self.resolve(self.views.get(name))
    }

    pub fn find_view_case_sensitive(&self, name: &str) -> Option<&View> {
        self.find_view(name).filter(|view| view.name == name)
    }

    pub fn udfs(&self) -> impl Iterator<Item = &Udf> + '_ {
        self.list(&self.udfs)
    }

    pub fn find_udf(&self, name: &str) -> Option<&Udf> {
        self.resolve(self.udfs.get(name))
    }

    pub fn find_udf_case_sensitive(&self, name: &str) -> Option<&Udf> {
        self.find_udf(name).filter(|udf| udf.name == name)
    }

    // ---- indexes ----

    /// Every index, managed ones included, in creation order.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> + '_ {
        self.list(&self.indexes)
    }

    /// Direct lookup, then the fingerprint-tolerant managed index lookup.
    pub fn find_index(&self, name: &str) -> Option<&Index> {
        self.resolve(self.indexes.get(name))
            .or_else(|| self.find_managed_index(name))
    }

    pub fn find_index_case_sensitive(&self, name: &str) -> Option<&Index> {
        self.find_index(name).filter(|index| index.name == name)
    }

    /// Finds a managed index by a name whose fingerprint may differ from
    /// the stored one. Only the part before the fingerprint has to match.
    pub fn find_managed_index(&self, name: &str) -> Option<&Index> {
        let regex = MANAGED_INDEX_NAME.as_ref()?;
        let prefix = regex.captures(name)?.get(1)?.as_str().to_lowercase();
        self.indexes().find(|index| {
            index.is_managed()
                && index.name.len() == prefix.len() + FINGERPRINT_LENGTH
                && index.name.to_lowercase().starts_with(&prefix)
        })
    }

    /// Indexes named `name` in the default scope and in every named schema.
    pub fn find_indexes_under_name(&self, name: &str) -> Vec<&Index> {
        let mut found: Vec<&Index> = self.find_index(name).into_iter().collect();
        for named_schema in self.named_schemas() {
            if let Some(index) = self.find_index(&format!("{}.{}", named_schema.name, name)) {
                found.push(index);
            }
        }
        found
    }

    // ---- other entities ----

    pub fn change_streams(&self) -> impl Iterator<Item = &ChangeStream> + '_ {
        self.list(&self.change_streams)
    }

    pub fn find_change_stream(&self, name: &str) -> Option<&ChangeStream> {
        self.resolve(self.change_streams.get(name))
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> + '_ {
        self.list(&self.placements)
    }

    pub fn find_placement(&self, name: &str) -> Option<&Placement> {
        self.resolve(self.placements.get(name))
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> + '_ {
        self.list(&self.sequences)
    }

    /// Looks up a sequence; identity-column sequences are skipped when
    /// `exclude_internal` is set.
    pub fn find_sequence(&self, name: &str, exclude_internal: bool) -> Option<&Sequence> {
        self.resolve::<Sequence>(self.sequences.get(name))
            .filter(|seq| !(exclude_internal && seq.internal))
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> + '_ {
        self.list(&self.models)
    }

    pub fn find_model(&self, name: &str) -> Option<&Model> {
        self.resolve(self.models.get(name))
    }

    pub fn property_graphs(&self) -> impl Iterator<Item = &PropertyGraph> + '_ {
        self.list(&self.property_graphs)
    }

    pub fn find_property_graph(&self, name: &str) -> Option<&PropertyGraph> {
        self.resolve(self.property_graphs.get(name))
    }

    pub fn named_schemas(&self) -> impl Iterator<Item = &NamedSchema> + '_ {
        self.list(&self.named_schemas)
    }

    pub fn find_named_schema(&self, name: &str) -> Option<&NamedSchema> {
        self.resolve(self.named_schemas.get(name))
    }

    pub fn locality_groups(&self) -> impl Iterator<Item = &LocalityGroup> + '_ {
        self.list(&self.locality_groups)
    }

    pub fn find_locality_group(&self, name: &str) -> Option<&LocalityGroup> {
        self.resolve(self.locality_groups.get(name))
    }

    pub fn database_options(&self) -> Option<&DatabaseOptions> {
        self.resolve(self.database_options)
    }

    // ---- graph helpers ----

    pub fn table_columns(&self, table: &Table) -> Vec<&Column> {
        table.column_list(&self.graph)
    }

    pub fn find_column(&self, table: &Table, name: &str) -> Option<&Column> {
        table.find_column(&self.graph, name)
    }

    /// Tables interleaved directly in `table`.
    pub fn children_of(&self, table: NodeId) -> Vec<&Table> {
        self.graph
            .iter_as::<Table>()
            .filter(|t| t.parent == Some(table))
            .collect()
    }

    /// Foreign keys whose referenced table is `table`.
    pub fn referencing_foreign_keys(&self, table: NodeId) -> Vec<&ForeignKey> {
        self.graph
            .iter_as::<ForeignKey>()
            .filter(|fk| fk.referenced_table == table)
            .collect()
    }

    /// Every table, index data tables included.
    pub fn all_tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.graph.iter_as::<Table>()
    }
}
