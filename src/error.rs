//! Error taxonomy for the mapping core.
//!
//! Every failure carries enough context (type, field or SQL text) to be
//! diagnosed without looking at internals. Nothing in this crate logs an
//! error and carries on; callers always receive the `OrmError`.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, OrmError>;

#[derive(Debug, Error)]
pub enum OrmError {
    /// Declared metadata breaks a mapping rule, or SQL generation referenced
    /// a field the type does not declare.
    #[error("invalid mapping for `{type_name}`: {reason}")]
    InvalidMapping { type_name: String, reason: String },

    #[error("type `{0}` is not managed by this entity manager")]
    UnmanagedType(String),

    #[error("no value bound for parameter `:{name}` in `{sql}`")]
    MissingParameter { name: String, sql: String },

    #[error("field `{field}`: cannot convert {found} to {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("statement failed: `{sql}`")]
    Execution {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not acquire a database connection")]
    Connection(#[source] rusqlite::Error),
}

impl OrmError {
    pub(crate) fn invalid_mapping(type_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMapping {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn execution(sql: &str, source: rusqlite::Error) -> Self {
        Self::Execution {
            sql: sql.to_string(),
            source,
        }
    }
}
