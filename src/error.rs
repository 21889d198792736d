//! Error taxonomy for the synchronization core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad input to the position scheme or configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A generation/position mismatch or a broken topology. Never valid data.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("unresolvable reference: {0}")]
    UnresolvableReference(String),

    /// Structurally inconsistent bundle, rejected before any write.
    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    /// Constraint violation not covered by insert-if-absent semantics.
    #[error("store conflict: {0}")]
    StoreConflict(String),

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Map a write failure inside a bundle transaction.
    ///
    /// Constraint failures become `StoreConflict` so the caller can log the
    /// unit and retry it on a later pass.
    pub fn from_write(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, ref msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                SyncError::StoreConflict(
                    msg.clone().unwrap_or_else(|| code.to_string()),
                )
            }
            other => SyncError::Store(other),
        }
    }

    /// Whether the unit stays eligible for a later pass.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::StoreConflict(_) | SyncError::Store(_) | SyncError::Io(_)
        )
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
