use crate::error::{Error, Result};

pub const MAX_NAME_LENGTH: usize = 128;

const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "ARRAY", "AS", "ASC", "ASSERT_ROWS_MODIFIED", "AT", "BETWEEN", "BY",
    "CASE", "CAST", "COLLATE", "CONTAINS", "CREATE", "CROSS", "CUBE", "CURRENT", "DEFAULT",
    "DEFINE", "DESC", "DISTINCT", "ELSE", "END", "ENUM", "ESCAPE", "EXCEPT", "EXCLUDE", "EXISTS",
    "EXTRACT", "FALSE", "FETCH", "FOLLOWING", "FOR", "FROM", "FULL", "GROUP", "GROUPING",
    "GROUPS", "HASH", "HAVING", "IF", "IGNORE", "IN", "INNER", "INTERSECT", "INTERVAL", "INTO",
    "IS", "JOIN", "LATERAL", "LEFT", "LIKE", "LIMIT", "LOOKUP", "MERGE", "NATURAL", "NEW", "NO",
    "NOT", "NULL", "NULLS", "OF", "ON", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PRECEDING",
    "PROTO", "RANGE", "RECURSIVE", "RESPECT", "RIGHT", "ROLLUP", "ROWS", "SELECT", "SET", "SOME",
    "STRUCT", "TABLESAMPLE", "THEN", "TO", "TREAT", "TRUE", "UNBOUNDED", "UNION", "UNNEST",
    "USING", "WHEN", "WHERE", "WINDOW", "WITH", "WITHIN",
];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}

/// Splits `schema.object` into its parts. Unqualified names have an empty
/// schema part.
pub fn split_schema_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((schema, object)) => (schema, object),
        None => ("", name),
    }
}

/// Validates a single identifier, e.g. a column name.
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::schema(format!("{kind} name cannot be empty.")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::schema(format!(
            "{kind} name not valid: {name}. Names must be at most {MAX_NAME_LENGTH} characters."
        )));
    }
    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::schema(format!("{kind} name not valid: {name}.")));
    }
    if is_reserved_word(name) {
        return Err(Error::schema(format!(
            "{kind} name not valid: {name} is a reserved keyword."
        )));
    }
    Ok(())
}

/// Validates a schema object name, which may carry one `schema.` prefix.
pub fn validate_schema_name(kind: &str, name: &str) -> Result<()> {
    let (schema, object) = split_schema_name(name);
    if !schema.is_empty() {
        validate_identifier("Schema", schema)?;
    }
    if name.contains('.') && schema.is_empty() {
        return Err(Error::schema(format!("{kind} name not valid: {name}.")));
    }
    validate_identifier(kind, object)
}
