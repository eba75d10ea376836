//! Naming authority error types

use thiserror::Error;

/// Errors reported by a naming authority (existence oracle or creator)
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Naming authority unavailable: {0}")]
    Unavailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the authority refused a creation because the name is taken.
    ///
    /// Everything else is treated as a transient failure by callers.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, CloudError::AlreadyExists(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
