//! Error types for sqlbind

use std::time::Duration;
use thiserror::Error;

/// The main error type for sqlbind operations.
///
/// Parse, resolution, conflict and naming errors are statement-scoped: they
/// degrade the offending statement's descriptor and never stop sibling
/// statements. Schema acquisition failures are run-fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Parse errors
    #[error("parse error: {0}")]
    Parse(String),

    // Resolution errors
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("ambiguous column reference: {0}")]
    AmbiguousColumn(String),

    // Conflict errors
    #[error("conflicting types for parameter {position}: {first} vs {second}")]
    ParamConflict {
        position: String,
        first: String,
        second: String,
    },

    #[error("statement mixes '?' and '$n' placeholder styles")]
    MixedPlaceholders,

    // Naming errors
    #[error("duplicate statement name: {0}")]
    DuplicateName(String),

    // Run-fatal schema errors
    #[error("schema source timed out after {0:?}")]
    SchemaTimeout(Duration),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Run-fatal errors abort the whole run; everything else is scoped to a
    /// single statement.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SchemaTimeout(_) | Error::Schema(_) | Error::Io(_) | Error::Internal(_)
        )
    }
}

/// Result type alias using sqlbind's Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::SchemaTimeout(Duration::from_secs(5)).is_fatal());
        assert!(Error::Schema("connection refused".into()).is_fatal());
        assert!(!Error::Parse("bad token".into()).is_fatal());
        assert!(!Error::TableNotFound("items".into()).is_fatal());
        assert!(!Error::DuplicateName("fetchItems".into()).is_fatal());
    }
}
