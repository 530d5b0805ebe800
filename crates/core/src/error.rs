use crate::types::{EntityId, JobId};

/// Caller-facing error of the generation tracker.
///
/// Background failures (synthesis, catalog) never surface here; they are
/// recorded on the job or logged.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: EntityId },

    /// The request broke a field rule or a tier limit. Nothing was created.
    #[error("Invalid generation request: {0}")]
    Validation(String),

    /// An externally supplied id is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn job_not_found(id: JobId) -> Self {
        CoreError::NotFound { entity: "job", id }
    }

    pub fn job_conflict(id: JobId) -> Self {
        CoreError::Conflict(format!("job {id} already exists"))
    }

    /// Whether the error rejects the caller's input rather than reporting a
    /// missing record or a fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoreError::Validation(_) | CoreError::Conflict(_))
    }
}
