use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lnk_core::LinkStoreConfig;
use lnk_store::{StoreConfig, SyncMode};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, loadable from TOML. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Record store journal file.
    pub db_path: PathBuf,
    /// Prefix of every short URL handed back to clients.
    pub domain: String,
    pub lock_timeout_ms: u64,
    /// Longest TTL a client may request; unset means the cache's cap.
    pub max_ttl_secs: Option<u64>,
    /// fsync the journal after every committed write.
    pub sync_every_write: bool,
    /// Pages served for non-alias paths; `404.html` here answers unknown
    /// and expired aliases.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            db_path: PathBuf::from("lnk.db"),
            domain: "http://localhost:5000".to_string(),
            lock_timeout_ms: 1_000,
            max_ttl_secs: None,
            sync_every_write: false,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn store_config(&self) -> StoreConfig {
        let sync_mode = if self.sync_every_write {
            SyncMode::EveryWrite
        } else {
            SyncMode::OsDefault
        };
        StoreConfig::new()
            .with_lock_timeout(Duration::from_millis(self.lock_timeout_ms))
            .with_sync_mode(sync_mode)
    }

    pub fn link_store_config(&self) -> LinkStoreConfig {
        let config = LinkStoreConfig::default();
        match self.max_ttl_secs {
            Some(secs) => config.with_max_ttl(Duration::from_secs(secs)),
            None => config,
        }
    }
}
