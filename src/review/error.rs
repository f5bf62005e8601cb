//! Review error taxonomy

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors surfaced by the review operations.
///
/// Validation failures are returned before anything is written, so a caller
/// seeing an error can retry the whole submission.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Invalid rating {0}: expected an integer between 1 and 4")]
    InvalidRating(i64),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Only ever logged; computed state is clamped back into range instead.
    #[error("State invariant violated: {0}")]
    StateInvariantViolation(String),

    #[error("Storage temporarily unavailable: {0}")]
    TransientStorage(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ReviewError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

impl From<StorageError> for ReviewError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DeckNotFound(id) => Self::not_found("Deck", id),
            StorageError::WordNotFound(id) => Self::not_found("Word", id),
            StorageError::CardNotFound(id) => Self::not_found("Card", id),
            StorageError::TemplateNotFound(id) => Self::not_found("Template", id),
            StorageError::SessionNotFound(id) => Self::not_found("Session", id),
            StorageError::Transient(msg) => Self::TransientStorage(msg),
            other if other.is_transient() => Self::TransientStorage(other.to_string()),
            other => Self::Storage(other),
        }
    }
}

/// Log an invariant that had to be repaired in place.
pub(crate) fn report_invariant(message: String) {
    log::warn!("{}", ReviewError::StateInvariantViolation(message));
}

pub type Result<T> = std::result::Result<T, ReviewError>;
