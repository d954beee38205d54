use std::time::Duration;

use lnk_cache::CacheError;
use lnk_store::StoreError;
use lnk_types::TypeError;
use thiserror::Error;

/// Errors from link store operations.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid origin: {0:?}")]
    InvalidOrigin(String),

    #[error("invalid ttl {ttl:?}: must be at least 1ms and at most {max:?}")]
    InvalidTtl { ttl: Duration, max: Duration },

    #[error("alias not found: {0}")]
    NotFound(String),

    #[error("alias expired: {0}")]
    Expired(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("undecodable record for {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: TypeError,
    },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl LinkError {
    /// Whether the alias is simply not resolvable right now.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }

    pub(crate) fn from_cache(alias: &str, err: CacheError) -> Self {
        match err {
            CacheError::NotFound => Self::NotFound(alias.to_string()),
            CacheError::Expired => Self::Expired(alias.to_string()),
            other => Self::Cache(other),
        }
    }
}

pub type LinkResult<T> = Result<T, LinkError>;
