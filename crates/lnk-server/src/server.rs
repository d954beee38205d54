use std::net::SocketAddr;
use std::sync::Arc;

use lnk_core::LinkStore;
use lnk_store::RecordStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// lnk HTTP server.
pub struct LnkServer {
    config: ServerConfig,
    links: Arc<LinkStore>,
}

impl LnkServer {
    /// Open the record store at `config.db_path` and warm-start the cache.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let records = RecordStore::open(&config.db_path, config.store_config())?;
        let links = LinkStore::open(Arc::new(records), config.link_store_config())?;
        Ok(Self::with_links(config, Arc::new(links)))
    }

    pub fn with_links(config: ServerConfig, links: Arc<LinkStore>) -> Self {
        Self { config, links }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn links(&self) -> &Arc<LinkStore> {
        &self.links
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(Arc::clone(&self.links), &self.config.domain);
        let state = match &self.config.static_dir {
            Some(dir) => state.with_static_dir(dir),
            None => state,
        };
        build_router(state)
    }

    /// Serve until Ctrl-C, then stop the expiry timer.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            db = %self.config.db_path.display(),
            "lnk server listening"
        );

        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()));

        self.links.close();
        tracing::info!("lnk server stopped");
        result
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
