use std::time::Duration;

/// Cap applied to every TTL (~100 years).
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Configuration for an [`ExpiringCache`](crate::ExpiringCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Longest residency any entry may be given; longer TTLs are clamped.
    pub max_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_ttl: MAX_TTL }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl.min(MAX_TTL);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_caps_at_a_century() {
        assert_eq!(CacheConfig::default().max_ttl, MAX_TTL);
    }

    #[test]
    fn max_ttl_cannot_exceed_cap() {
        let config = CacheConfig::new().with_max_ttl(Duration::MAX);
        assert_eq!(config.max_ttl, MAX_TTL);

        let config = CacheConfig::new().with_max_ttl(Duration::from_secs(3));
        assert_eq!(config.max_ttl, Duration::from_secs(3));
    }
}
