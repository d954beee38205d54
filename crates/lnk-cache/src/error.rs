/// Errors from cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// No entry exists for the key (never inserted, or already evicted).
    #[error("key not found")]
    NotFound,

    /// The entry's countdown elapsed; it is no longer served.
    #[error("key expired")]
    Expired,

    /// The cache was constructed outside a Tokio runtime.
    #[error("expiring cache requires a Tokio runtime")]
    NoRuntime,
}
