use thiserror::Error;

/// Errors raised by schema evolution, catalog lookups and write-time actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Structural problem with a schema change: dangling reference, cycle,
    /// name collision or an invalid attribute.
    #[error("schema error: {0}")]
    Schema(String),

    /// A write violated NOT NULL, uniqueness, referential integrity,
    /// interleaving or a check constraint.
    #[error("{message}")]
    ConstraintViolation {
        constraint: String,
        table: String,
        message: String,
    },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A default or generated column expression failed for a specific column.
    #[error("error evaluating column `{column}`: {message}")]
    Evaluation { column: String, message: String },

    #[error("expression error: {0}")]
    Expression(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }

    pub fn violation(
        constraint: impl Into<String>,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::ConstraintViolation {
            constraint: constraint.into(),
            table: table.into(),
            message: message.into(),
        }
    }

    /// Attributes an expression failure to the column being computed.
    pub fn for_column(self, column: &str) -> Self {
        match self {
            Error::Expression(message) | Error::TypeMismatch(message) => Error::Evaluation {
                column: column.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Name of the violated constraint, when this is a constraint violation.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Error::ConstraintViolation { constraint, .. } => Some(constraint),
            _ => None,
        }
    }
}
