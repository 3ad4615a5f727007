use std::time::Duration;

use thiserror::Error;

/// Error taxonomy for every operation that can fail.
///
/// `Validation` is always resolved locally, before any collaborator call.
/// `Transient` and `Timeout` are the only kinds safe to retry.
#[derive(Error, Debug)]
pub enum CampusError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CampusError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CampusError::Transient(_) | CampusError::Timeout(_))
    }
}
