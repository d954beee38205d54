use std::time::Duration;

/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the journal file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store lock could not be acquired within the configured timeout.
    #[error("store lock not acquired within {0:?}")]
    LockTimeout(Duration),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
