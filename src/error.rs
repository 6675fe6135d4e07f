//! Error types for the planting wizard.

use serde::{Deserialize, Serialize};

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    /// Storage failures are always reported as persistence failures.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PersistenceFailure
    }
}

/// Classification of everything that can go wrong while filling the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required field is absent or empty.
    MissingValue,
    /// A field is present but fails a numeric bound.
    OutOfRange,
    /// A draft read or write failed. Never blocks navigation.
    PersistenceFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingValue => "missing_value",
            Self::OutOfRange => "out_of_range",
            Self::PersistenceFailure => "persistence_failure",
        };
        write!(f, "{s}")
    }
}

/// A step-scoped validation failure shown to the user after a blocked advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::MissingValue,
            message: message.into(),
        }
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::OutOfRange,
            message: message.into(),
        }
    }
}
