use std::time::Duration;

/// Flush/sync strategy for the log journal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every committed batch.
    EveryWrite,
    /// Flush to the OS and rely on page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for a [`RecordStore`](crate::RecordStore).
///
/// ```rust
/// use lnk_store::{StoreConfig, SyncMode};
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_lock_timeout(Duration::from_millis(250))
///     .with_sync_mode(SyncMode::EveryWrite);
/// assert_eq!(config.lock_timeout, Duration::from_millis(250));
/// ```
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Upper bound on waiting for the store lock (default: 1 second).
    pub lock_timeout: Duration,
    pub sync_mode: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(1),
            sync_mode: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }
}
