use crate::entities::RecordKind;
use crate::storage::StorageError;
use thiserror::Error;

/// A raw payload that cannot become a normalized record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformValidationError {
    #[error("{kind} payload is missing required field `{field}`")]
    MissingField { kind: RecordKind, field: &'static str },

    #[error("{kind} payload has invalid `{field}`: {reason}")]
    InvalidField {
        kind: RecordKind,
        field: &'static str,
        reason: String,
    },
}

/// Errors of the event pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The queue is at capacity. The caller has to shed load.
    #[error("event queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("validation failed: {0}")]
    Validation(#[from] TransformValidationError),

    #[error("storage write failed: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Only transient storage failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Storage(e) => e.is_transient(),
            PipelineError::QueueFull { .. } | PipelineError::Validation(_) => false,
        }
    }
}
