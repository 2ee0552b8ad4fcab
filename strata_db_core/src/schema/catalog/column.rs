use crate::error::{Error, Result};
use crate::eval::Expression;
use crate::schema::context::{SchemaChangeAction, ValidationContext};
use crate::schema::editor::CloneContext;
use crate::schema::graph::NodeId;
use crate::schema::names::validate_identifier;
use crate::schema::node::{NameInfo, NodeKind, SchemaEntity, SchemaNode};
use crate::types::datatype::DataType;

use super::{Sequence, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedColumn {
    pub expression: Expression,
    pub stored: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: NodeId,
    pub name: String,
    pub table: NodeId,
    pub data_type: DataType,
    pub nullable: bool,
    pub max_length: Option<i64>,
    pub default_value: Option<Expression>,
    pub generated: Option<GeneratedColumn>,
    /// Internal sequence backing an identity column.
    pub identity_sequence: Option<NodeId>,
    /// Sequences named by the default expression.
    pub sequences_used: Vec<NodeId>,
    pub allows_commit_timestamp: bool,
    pub placement_key: bool,
    pub hidden: bool,
    /// For columns of an index data table, the indexed table column.
    pub source_column: Option<NodeId>,
}

impl Column {
    pub fn new(id: NodeId, name: impl Into<String>, table: NodeId, data_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            table,
            data_type,
            nullable: true,
            max_length: None,
            default_value: None,
            generated: None,
            identity_sequence: None,
            sequences_used: Vec::new(),
            allows_commit_timestamp: false,
            placement_key: false,
            hidden: false,
            source_column: None,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    pub fn is_identity(&self) -> bool {
        self.identity_sequence.is_some()
    }

    /// Columns that receive a value when a write leaves them out.
    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some() || self.identity_sequence.is_some()
    }

    pub fn is_stored_generated(&self) -> bool {
        self.generated.as_ref().map(|g| g.stored).unwrap_or(false)
    }

    pub fn sql_type(&self) -> String {
        self.data_type.sql_name(self.max_length)
    }

    fn qualified_name(&self, table: &Table) -> String {
        format!("{}.{}", table.name, self.name)
    }
}

impl SchemaEntity for Column {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Column
    }

    fn name_info(&self) -> Vec<NameInfo> {
        Vec::new()
    }

    fn references(&self) -> Vec<NodeId> {
        let mut refs = vec![self.table];
        refs.extend(self.sequences_used.iter().copied());
        refs.extend(self.identity_sequence);
        refs.extend(self.source_column);
        refs
    }

    fn owned(&self) -> Vec<NodeId> {
        self.identity_sequence.into_iter().collect()
    }

    fn deep_clone(&mut self, ctx: &CloneContext<'_>) -> Result<()> {
        ctx.require(&*self, self.table)?;
        ctx.require_all(&*self, &self.sequences_used)?;
        if let Some(seq) = self.identity_sequence {
            ctx.require(&*self, seq)?;
        }
        if let Some(source) = self.source_column {
            ctx.require(&*self, source)?;
        }
        Ok(())
    }

    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<()> {
        validate_identifier("Column", &self.name)?;
        let table: &Table = ctx.require(self.table, "Column")?;
        let qualified = self.qualified_name(table);
        if !table.columns.contains(&self.id) {
            return Err(Error::Internal(format!(
                "column {qualified} is not listed by its table"
            )));
        }

        if let Some(length) = self.max_length {
            let Some(limit) = self.data_type.max_length_limit() else {
                return Err(Error::schema(format!(
                    "Column {qualified}: a length can only be declared for STRING and BYTES columns."
                )));
            };
            if length < 1 || length > limit {
                return Err(Error::schema(format!(
                    "Bad length for column {qualified}: {length} : Allowed length range: [1, {limit}]."
                )));
            }
        }

        if self.allows_commit_timestamp && self.data_type != DataType::Timestamp {
            return Err(Error::schema(format!(
                "Column {qualified}: allow_commit_timestamp is only allowed on TIMESTAMP columns."
            )));
        }

        if self.default_value.is_some() && self.generated.is_some() {
            return Err(Error::schema(format!(
                "Column {qualified} cannot have both a default value and a generation expression."
            )));
        }

        if let Some(seq) = self.identity_sequence {
            if self.data_type != DataType::Int64 {
                return Err(Error::schema(format!(
                    "Identity column {qualified} must be of type INT64."
                )));
            }
            if self.default_value.is_some() || self.generated.is_some() {
                return Err(Error::schema(format!(
                    "Identity column {qualified} cannot have a default value or a generation expression."
                )));
            }
            let sequence: &Sequence = ctx.require(seq, "Identity column")?;
            if !sequence.internal {
                return Err(Error::Internal(format!(
                    "identity column {qualified} is backed by a user sequence"
                )));
            }
        }

        for seq in &self.sequences_used {
            ctx.require::<Sequence>(*seq, "Column default")?;
        }

        if let Some(default) = &self.default_value {
            if !default.referenced_columns().is_empty() {
                return Err(Error::schema(format!(
                    "Default value expression of column {qualified} cannot reference other columns."
                )));
            }
        }

        if let Some(generated) = &self.generated {
            if generated.expression.uses_sequences() {
                return Err(Error::schema(format!(
                    "Generated column {qualified} cannot use sequence functions."
                )));
            }
            for referenced in generated.expression.referenced_columns() {
                if referenced == self.name.to_lowercase() {
                    return Err(Error::schema(format!(
                        "Generated column {qualified} cannot reference itself."
                    )));
                }
                let found = table
                    .columns
                    .iter()
                    .filter_map(|id| ctx.graph().get_as::<Column>(*id))
                    .any(|c| c.name.eq_ignore_ascii_case(&referenced));
                if !found {
                    return Err(Error::schema(format!(
                        "Generated column {qualified} references unknown column {referenced}."
                    )));
                }
            }
        }

        if let Some(source) = self.source_column {
            ctx.require::<Column>(source, "Index data column")?;
        }

        let added_to_existing_table = ctx.existed_before(self.table)
            && !ctx.existed_before(self.id)
            && table.owner_index.is_none();
        if added_to_existing_table {
            let computed = self.has_default_value() || self.is_stored_generated();
            if !self.nullable && !computed {
                return Err(Error::schema(format!(
                    "Cannot add NOT NULL column {qualified} to existing table {}.",
                    table.name
                )));
            }
            if computed {
                ctx.add_action(SchemaChangeAction::BackfillColumn {
                    table: self.table,
                    column: self.id,
                });
            }
        }
        Ok(())
    }

    fn validate_update(&self, old: &SchemaNode, ctx: &mut ValidationContext<'_>) -> Result<()> {
        let Some(old) = old.as_column() else {
            return Err(Error::Internal("column replaced by another kind".to_string()));
        };
        let table: &Table = ctx.require(self.table, "Column")?;
        let qualified = self.qualified_name(table);

        if old.data_type != self.data_type {
            return Err(Error::schema(format!(
                "Cannot change the data type of column {qualified} from {} to {}.",
                old.data_type, self.data_type
            )));
        }
        if old.generated.is_some() != self.generated.is_some() {
            return Err(Error::schema(format!(
                "Cannot convert column {qualified} to or from a generated column."
            )));
        }
        if let (Some(before), Some(after)) = (&old.generated, &self.generated) {
            if before != after {
                return Err(Error::schema(format!(
                    "Cannot change the expression of generated column {qualified}."
                )));
            }
        }
        if old.is_identity() != self.is_identity() {
            return Err(Error::schema(format!(
                "Cannot convert column {qualified} to or from an identity column."
            )));
        }

        if table.owner_index.is_none() {
            if old.nullable && !self.nullable {
                ctx.add_action(SchemaChangeAction::VerifyNotNull {
                    table: self.table,
                    column: self.id,
                });
            }
            if let Some(length) = self.max_length {
                if old.max_length.map(|before| before > length).unwrap_or(true) {
                    ctx.add_action(SchemaChangeAction::VerifyMaxLength {
                        table: self.table,
                        column: self.id,
                        max_length: length,
                    });
                }
            }
        }
        Ok(())
    }
}
