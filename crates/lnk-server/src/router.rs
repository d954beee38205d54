use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all lnk endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handler::static_handler).post(handler::create_handler),
        )
        .route("/history", get(handler::history_handler))
        .route("/v1/health", get(handler::health_handler))
        .route("/:alias", get(handler::resolve_handler))
        .fallback(handler::static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
