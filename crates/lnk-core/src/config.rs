use std::time::Duration;

use lnk_cache::{CacheConfig, MAX_TTL};

/// Configuration for a [`LinkStore`](crate::LinkStore).
#[derive(Debug, Clone)]
pub struct LinkStoreConfig {
    /// Longest TTL a caller may request.
    pub max_ttl: Duration,
    /// Repopulate the cache from the record store when opening.
    pub warm_start: bool,
}

impl Default for LinkStoreConfig {
    fn default() -> Self {
        Self {
            max_ttl: CacheConfig::default().max_ttl,
            warm_start: true,
        }
    }
}

impl LinkStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capped at the cache's own ceiling, [`MAX_TTL`].
    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl.min(MAX_TTL);
        self
    }

    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub(crate) fn cache_config(&self) -> CacheConfig {
        CacheConfig::default().with_max_ttl(self.max_ttl)
    }
}
