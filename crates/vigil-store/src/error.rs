//! Error types for occurrence storage and review queries.

use vigil_core::{OccurrenceId, VigilError};

/// Errors from occurrence store mutations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The id is already present. Signals an id-generation bug upstream;
    /// retrying will not help.
    #[error("Occurrence already exists: {0}")]
    DuplicateId(OccurrenceId),
    #[error("Occurrence not found: {0}")]
    NotFound(OccurrenceId),
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

/// Errors from the filter/page engine.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("Page size must be greater than zero")]
    ZeroPageSize,
}

impl From<StoreError> for VigilError {
    fn from(err: StoreError) -> Self {
        VigilError::InvalidArgument(err.to_string())
    }
}

impl From<ViewError> for VigilError {
    fn from(err: ViewError) -> Self {
        VigilError::InvalidArgument(err.to_string())
    }
}
