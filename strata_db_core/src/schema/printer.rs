//! Renders structured DDL statements as SQL text.

use super::catalog::{ModelColumn, OnDeleteAction, StorageKind};
use super::ddl::{
    AlterTableAction, ChangeStreamForDef, ChangeStreamOptions, CheckDef, ColumnDef,
    CreateChangeStream, CreateIndex, CreateTable, DdlStatement, ForeignKeyDef, KeyPart,
};
use super::facade::Schema;
use super::names::is_reserved_word;

/// The dump of `schema`, one SQL statement per entry.
pub fn print_ddl_statements(schema: &Schema) -> Vec<String> {
    schema.dump().iter().map(print_statement).collect()
}

pub fn print_statement(statement: &DdlStatement) -> String {
    match statement {
        DdlStatement::CreateSchema(s) => {
            format!("CREATE SCHEMA {}{}", if_not_exists(s.if_not_exists), quote(&s.name))
        }
        DdlStatement::DropSchema(d) => drop_statement("SCHEMA", &d.name, d.if_exists),
        DdlStatement::CreateSequence(s) => {
            let mut options = Vec::new();
            if let Some(kind) = s.kind {
                options.push(format!("sequence_kind = '{}'", kind.option_value()));
            }
            if let Some((min, max)) = s.skip_range {
                options.push(format!("skip_range_min = {min}"));
                options.push(format!("skip_range_max = {max}"));
            }
            if let Some(start) = s.start_with_counter {
                options.push(format!("start_with_counter = {start}"));
            }
            format!(
                "CREATE SEQUENCE {}{}{}",
                if_not_exists(s.if_not_exists),
                quote(&s.name),
                options_clause(&options)
            )
        }
        DdlStatement::AlterSequence(s) => {
            let mut options = Vec::new();
            if let Some(kind) = s.kind {
                options.push(format!("sequence_kind = '{}'", kind.option_value()));
            }
            if let Some((min, max)) = s.skip_range {
                options.push(format!("skip_range_min = {min}"));
                options.push(format!("skip_range_max = {max}"));
            } else if s.clear_skip_range {
                options.push("skip_range_min = NULL".to_string());
                options.push("skip_range_max = NULL".to_string());
            }
            if let Some(start) = s.start_with_counter {
                options.push(format!("start_with_counter = {start}"));
            }
            format!("ALTER SEQUENCE {} SET{}", quote(&s.name), options_clause(&options))
        }
        DdlStatement::DropSequence(d) => drop_statement("SEQUENCE", &d.name, d.if_exists),
        DdlStatement::CreateTable(t) => print_create_table(t),
        DdlStatement::AlterTable(t) => {
            format!("ALTER TABLE {} {}", quote(&t.table), print_alter_action(&t.action))
        }
        DdlStatement::DropTable(d) => drop_statement("TABLE", &d.name, d.if_exists),
        DdlStatement::CreateIndex(i) => print_create_index(i),
        DdlStatement::DropIndex(d) => drop_statement("INDEX", &d.name, d.if_exists),
        DdlStatement::CreateModel(m) => {
            let columns = |cols: &[ModelColumn]| {
                cols.iter()
                    .map(|c| format!("{} {}", quote(&c.name), c.data_type))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let mut options = Vec::new();
            if let Some(endpoint) = &m.endpoint {
                options.push(format!("endpoint = '{endpoint}'"));
            }
            if !m.endpoints.is_empty() {
                let list: Vec<String> = m.endpoints.iter().map(|e| format!("'{e}'")).collect();
                options.push(format!("endpoints = [{}]", list.join(", ")));
            }
            if let Some(size) = m.default_batch_size {
                options.push(format!("default_batch_size = {size}"));
            }
            format!(
                "CREATE {}MODEL {}{} INPUT ({}) OUTPUT ({}){}{}",
                if m.or_replace { "OR REPLACE " } else { "" },
                if_not_exists(m.if_not_exists),
                quote(&m.name),
                columns(&m.input),
                columns(&m.output),
                if m.remote { " REMOTE" } else { "" },
                options_clause(&options)
            )
        }
        DdlStatement::DropModel(d) => drop_statement("MODEL", &d.name, d.if_exists),
        DdlStatement::CreatePropertyGraph(g) => format!(
            "CREATE {}PROPERTY GRAPH {} {}",
            if g.or_replace { "OR REPLACE " } else { "" },
            quote(&g.name),
            g.ddl_body.trim()
        ),
        DdlStatement::DropPropertyGraph(d) => drop_statement("PROPERTY GRAPH", &d.name, d.if_exists),
        DdlStatement::CreateView(v) => format!(
            "CREATE {}VIEW {} SQL SECURITY {} AS {}",
            if v.or_replace { "OR REPLACE " } else { "" },
            quote(&v.name),
            v.security.sql(),
            v.body.trim()
        ),
        DdlStatement::DropView(d) => drop_statement("VIEW", &d.name, d.if_exists),
        DdlStatement::CreateFunction(f) => {
            let params: Vec<String> = f
                .parameters
                .iter()
                .map(|p| format!("{} {}", quote(&p.name), p.data_type))
                .collect();
            let returns = f
                .return_type
                .as_ref()
                .map(|t| format!(" RETURNS {t}"))
                .unwrap_or_default();
            format!(
                "CREATE {}FUNCTION {}({}){} SQL SECURITY {} AS ({})",
                if f.or_replace { "OR REPLACE " } else { "" },
                quote(&f.name),
                params.join(", "),
                returns,
                f.security.sql(),
                f.body.trim()
            )
        }
        DdlStatement::DropFunction(d) => drop_statement("FUNCTION", &d.name, d.if_exists),
        DdlStatement::CreateChangeStream(c) => print_create_change_stream(c),
        DdlStatement::AlterChangeStream(c) => {
            let mut parts = Vec::new();
            if let Some(clause) = &c.set_for {
                parts.push(format!("SET {}", print_for_clause(clause)));
            }
            if c.drop_for_all {
                parts.push("DROP FOR ALL".to_string());
            }
            if let Some(options) = &c.set_options {
                parts.push(format!("SET{}", options_clause(&change_stream_options(options))));
            }
            format!("ALTER CHANGE STREAM {} {}", quote(&c.name), parts.join(" "))
        }
        DdlStatement::DropChangeStream(d) => drop_statement("CHANGE STREAM", &d.name, d.if_exists),
        DdlStatement::AlterDatabase(a) => {
            let options: Vec<String> = [
                ("default_time_zone", &a.default_time_zone),
                ("default_sequence_kind", &a.default_sequence_kind),
                ("version_retention_period", &a.version_retention_period),
                ("optimizer_version", &a.optimizer_version),
                ("witness_location", &a.witness_location),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name} = '{v}'")))
            .collect();
            format!("ALTER DATABASE {} SET{}", quote(&a.name), options_clause(&options))
        }
        DdlStatement::CreateLocalityGroup(l) => {
            let options = locality_options(l.storage, Some(&l.ssd_to_hdd_spill_timespans));
            format!("CREATE LOCALITY GROUP {}{}", quote(&l.name), options_clause(&options))
        }
        DdlStatement::AlterLocalityGroup(l) => {
            let options = locality_options(l.storage, l.ssd_to_hdd_spill_timespans.as_ref());
            format!("ALTER LOCALITY GROUP {} SET{}", quote(&l.name), options_clause(&options))
        }
        DdlStatement::DropLocalityGroup(d) => drop_statement("LOCALITY GROUP", &d.name, d.if_exists),
        DdlStatement::CreatePlacement(p) => {
            let mut options = Vec::new();
            if let Some(partition) = &p.instance_partition {
                options.push(format!("instance_partition = '{partition}'"));
            }
            if let Some(leader) = &p.default_leader {
                options.push(format!("default_leader = '{leader}'"));
            }
            format!("CREATE PLACEMENT {}{}", quote(&p.name), options_clause(&options))
        }
        DdlStatement::DropPlacement(d) => drop_statement("PLACEMENT", &d.name, d.if_exists),
    }
}

/// Quotes each part of a possibly schema-qualified name that needs it.
fn quote(name: &str) -> String {
    name.split('.')
        .map(|part| {
            if is_reserved_word(part) {
                format!("`{part}`")
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn if_not_exists(flag: bool) -> &'static str {
    if flag { "IF NOT EXISTS " } else { "" }
}

fn drop_statement(kind: &str, name: &str, if_exists: bool) -> String {
    format!(
        "DROP {kind} {}{}",
        if if_exists { "IF EXISTS " } else { "" },
        quote(name)
    )
}

fn options_clause(options: &[String]) -> String {
    if options.is_empty() {
        String::new()
    } else {
        format!(" OPTIONS ({})", options.join(", "))
    }
}

fn key_part(part: &KeyPart) -> String {
    let order = match (part.descending, part.nulls_last) {
        (false, false) => "",
        (false, true) => " ASC NULLS LAST",
        (true, false) => " DESC NULLS FIRST",
        (true, true) => " DESC",
    };
    format!("{}{order}", quote(&part.column))
}

fn key_list(parts: &[KeyPart]) -> String {
    parts.iter().map(key_part).collect::<Vec<_>>().join(", ")
}

fn print_column(column: &ColumnDef) -> String {
    let mut out = format!("{} {}", quote(&column.name), column.data_type.sql_name(column.length));
    if column.not_null {
        out.push_str(" NOT NULL");
    }
    if let Some(identity) = &column.identity {
        out.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        let mut options = Vec::new();
        if let Some(kind) = identity.kind {
            options.push(kind.option_value().to_uppercase());
        }
        if let Some((min, max)) = identity.skip_range {
            options.push(format!("SKIP RANGE {min}, {max}"));
        }
        if let Some(start) = identity.start_with_counter {
            options.push(format!("START COUNTER WITH {start}"));
        }
        if !options.is_empty() {
            out.push_str(&format!(" ({})", options.join(" ")));
        }
    }
    if let Some(default) = &column.default {
        out.push_str(&format!(" DEFAULT ({default})"));
    }
    if let Some(generated) = &column.generated {
        out.push_str(&format!(" AS ({})", generated.expression));
        if generated.stored {
            out.push_str(" STORED");
        }
    }
    if column.hidden {
        out.push_str(" HIDDEN");
    }
    if column.placement_key {
        out.push_str(" PLACEMENT KEY");
    }
    if column.allow_commit_timestamp {
        out.push_str(" OPTIONS (allow_commit_timestamp = true)");
    }
    out
}

fn on_delete(action: OnDeleteAction) -> String {
    format!(" ON DELETE {}", action.sql())
}

fn print_foreign_key(fk: &ForeignKeyDef) -> String {
    let mut out = String::new();
    if let Some(name) = &fk.name {
        out.push_str(&format!("CONSTRAINT {} ", quote(name)));
    }
    let columns: Vec<String> = fk.columns.iter().map(|c| quote(c)).collect();
    let referenced: Vec<String> = fk.referenced_columns.iter().map(|c| quote(c)).collect();
    out.push_str(&format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        columns.join(", "),
        quote(&fk.referenced_table),
        referenced.join(", ")
    ));
    if fk.on_delete != OnDeleteAction::NoAction {
        out.push_str(&on_delete(fk.on_delete));
    }
    if !fk.enforced {
        out.push_str(" NOT ENFORCED");
    }
    out
}

fn print_check(check: &CheckDef) -> String {
    match &check.name {
        Some(name) => format!("CONSTRAINT {} CHECK ({})", quote(name), check.expression),
        None => format!("CHECK ({})", check.expression),
    }
}

fn print_create_table(table: &CreateTable) -> String {
    let mut elements: Vec<String> = table.columns.iter().map(print_column).collect();
    elements.extend(table.foreign_keys.iter().map(print_foreign_key));
    elements.extend(table.check_constraints.iter().map(print_check));
    if let Some(synonym) = &table.synonym {
        elements.push(format!("SYNONYM ({})", quote(synonym)));
    }
    let mut out = format!(
        "CREATE TABLE {}{} (\n  {}\n) PRIMARY KEY ({})",
        if_not_exists(table.if_not_exists),
        quote(&table.name),
        elements.join(",\n  "),
        key_list(&table.primary_key)
    );
    if let Some(interleave) = &table.interleave_in_parent {
        out.push_str(&format!(",\n  INTERLEAVE IN PARENT {}", quote(&interleave.parent)));
        if interleave.on_delete != OnDeleteAction::NoAction {
            out.push_str(&on_delete(interleave.on_delete));
        }
    }
    if let Some(policy) = &table.row_deletion_policy {
        out.push_str(&format!(
            ",\n  ROW DELETION POLICY (OLDER_THAN({}, INTERVAL {} DAY))",
            quote(&policy.column),
            policy.older_than_days
        ));
    }
    if let Some(group) = &table.locality_group {
        out.push_str(&format!(", OPTIONS (locality_group = '{group}')"));
    }
    out
}

fn print_alter_action(action: &AlterTableAction) -> String {
    match action {
        AlterTableAction::AddColumn {
            column,
            if_not_exists: flag,
        } => format!("ADD COLUMN {}{}", if_not_exists(*flag), print_column(column)),
        AlterTableAction::DropColumn { column } => format!("DROP COLUMN {}", quote(column)),
        AlterTableAction::AlterColumn { column } => {
            format!("ALTER COLUMN {}", print_column(column))
        }
        AlterTableAction::AddForeignKey { foreign_key } => {
            format!("ADD {}", print_foreign_key(foreign_key))
        }
        AlterTableAction::AddCheckConstraint { check } => format!("ADD {}", print_check(check)),
        AlterTableAction::DropConstraint { name } => format!("DROP CONSTRAINT {}", quote(name)),
        AlterTableAction::SetOnDelete { on_delete: action } => {
            format!("SET{}", on_delete(*action))
        }
        AlterTableAction::AddRowDeletionPolicy { policy } => format!(
            "ADD ROW DELETION POLICY (OLDER_THAN({}, INTERVAL {} DAY))",
            quote(&policy.column),
            policy.older_than_days
        ),
        AlterTableAction::ReplaceRowDeletionPolicy { policy } => format!(
            "REPLACE ROW DELETION POLICY (OLDER_THAN({}, INTERVAL {} DAY))",
            quote(&policy.column),
            policy.older_than_days
        ),
        AlterTableAction::DropRowDeletionPolicy => "DROP ROW DELETION POLICY".to_string(),
        AlterTableAction::RenameTo { new_name, synonym } => match synonym {
            Some(synonym) => format!(
                "RENAME TO {}, ADD SYNONYM {}",
                quote(new_name),
                quote(synonym)
            ),
            None => format!("RENAME TO {}", quote(new_name)),
        },
        AlterTableAction::AddSynonym { synonym } => format!("ADD SYNONYM {}", quote(synonym)),
        AlterTableAction::DropSynonym { synonym } => format!("DROP SYNONYM {}", quote(synonym)),
        AlterTableAction::SetLocalityGroup { locality_group } => match locality_group {
            Some(group) => format!("SET OPTIONS (locality_group = '{group}')"),
            None => "SET OPTIONS (locality_group = NULL)".to_string(),
        },
    }
}

fn print_create_index(index: &CreateIndex) -> String {
    let mut out = format!(
        "CREATE {}{}INDEX {}{} ON {}({})",
        if index.unique { "UNIQUE " } else { "" },
        if index.null_filtered { "NULL_FILTERED " } else { "" },
        if_not_exists(index.if_not_exists),
        quote(&index.name),
        quote(&index.table),
        key_list(&index.key)
    );
    if !index.storing.is_empty() {
        let storing: Vec<String> = index.storing.iter().map(|c| quote(c)).collect();
        out.push_str(&format!(" STORING ({})", storing.join(", ")));
    }
    if let Some(parent) = &index.interleave_in {
        out.push_str(&format!(", INTERLEAVE IN {}", quote(parent)));
    }
    out
}

fn print_for_clause(clause: &ChangeStreamForDef) -> String {
    match clause {
        ChangeStreamForDef::All => "FOR ALL".to_string(),
        ChangeStreamForDef::Tables(tables) => {
            let tables: Vec<String> = tables
                .iter()
                .map(|t| match &t.columns {
                    Some(columns) => {
                        let columns: Vec<String> = columns.iter().map(|c| quote(c)).collect();
                        format!("{}({})", quote(&t.table), columns.join(", "))
                    }
                    None => quote(&t.table),
                })
                .collect();
            format!("FOR {}", tables.join(", "))
        }
    }
}

fn change_stream_options(options: &ChangeStreamOptions) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(period) = &options.retention_period {
        out.push(format!("retention_period = '{period}'"));
    }
    if let Some(capture) = &options.value_capture_type {
        out.push(format!("value_capture_type = '{capture}'"));
    }
    for (name, value) in [
        ("exclude_insert", options.exclude_insert),
        ("exclude_update", options.exclude_update),
        ("exclude_delete", options.exclude_delete),
        ("exclude_ttl_deletes", options.exclude_ttl_deletes),
    ] {
        if let Some(value) = value {
            out.push(format!("{name} = {value}"));
        }
    }
    out
}

fn print_create_change_stream(stream: &CreateChangeStream) -> String {
    let mut out = format!("CREATE CHANGE STREAM {}", quote(&stream.name));
    if let Some(clause) = &stream.for_clause {
        out.push(' ');
        out.push_str(&print_for_clause(clause));
    }
    out.push_str(&options_clause(&change_stream_options(&stream.options)));
    out
}

fn locality_options(
    storage: Option<StorageKind>,
    spans: Option<&Vec<String>>,
) -> Vec<String> {
    let mut options = Vec::new();
    if let Some(storage) = storage {
        options.push(format!("storage = '{}'", storage.option_value()));
    }
    if let Some(spans) = spans.filter(|s| !s.is_empty()) {
        options.push(format!("ssd_to_hdd_spill_timespan = '{}'", spans.join(",")));
    }
    options
}
