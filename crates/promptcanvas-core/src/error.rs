//! Error types for the generation subsystem.

use thiserror::Error;

/// Errors surfaced by canvas and generation operations.
///
/// Vanished elements are not errors: gateway reads return `None` and callers
/// stop tracking.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Canvas engine is not ready yet")]
    EngineNotReady,
    #[error("Too many {what}: {requested} given, model allows {limit}")]
    CapacityExceeded {
        what: &'static str,
        limit: usize,
        requested: usize,
    },
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CanvasError {
    /// Whether this error should be shown to the user as a notice.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::InvalidRequest(_) | Self::UnknownModel(_)
        )
    }
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;
