use crate::types::DbId;

/// Domain-level error shared by the db and api crates.
///
/// `code` fields carry a stable, machine-readable identifier (for example
/// `INVALID_RATING_VALUE`) that the HTTP layer echoes back to clients.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {message}")]
    Validation { code: &'static str, message: String },

    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        CoreError::Conflict {
            code,
            message: message.into(),
        }
    }

    /// The machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation { code, .. } | CoreError::Conflict { code, .. } => *code,
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
