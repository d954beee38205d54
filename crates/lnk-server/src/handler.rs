use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use lnk_core::{LinkError, LinkStore};
use lnk_types::{alias, LinkOwnerView};
use serde::Deserialize;
use serde_json::json;
use tower::util::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::client::client_address;
use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub links: Arc<LinkStore>,
    /// Prefix for the short URLs returned on creation.
    pub domain: Arc<str>,
    pub static_dir: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn new(links: Arc<LinkStore>, domain: &str) -> Self {
        Self {
            links,
            domain: Arc::from(domain.trim_end_matches('/')),
            static_dir: None,
        }
    }

    /// Serve pages from `dir` for every path that is not an alias.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(Arc::new(dir.into()));
        self
    }

    /// Public URL for `alias`.
    pub fn short_url(&self, alias: &str) -> String {
        format!("{}/{}", self.domain, alias)
    }
}

/// Page answering unknown and expired aliases.
const NOT_FOUND_PAGE: &str = "404.html";

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    pub origin: Option<String>,
    /// Lifetime in seconds; zero or negative keeps the link for as long
    /// as the store allows.
    pub ttl: Option<String>,
}

/// `POST /?origin=..&ttl=..`: create or revive, answering with the short URL.
pub async fn create_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(params): Query<CreateParams>,
) -> ServerResult<String> {
    let origin = params
        .origin
        .filter(|o| !o.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("missing origin".into()))?;
    let ttl = params
        .ttl
        .ok_or_else(|| ServerError::BadRequest("missing ttl".into()))?;
    let secs: i64 = ttl
        .trim()
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("ttl is not a number of seconds: {ttl:?}")))?;
    let ttl = match u64::try_from(secs) {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => state.links.config().max_ttl,
    };

    let owner = client_address(&headers, peer.map(|ConnectInfo(addr)| addr));
    let links = Arc::clone(&state.links);
    let link = tokio::task::spawn_blocking(move || {
        links.create_or_revive(&origin, &owner, ttl)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(state.short_url(&link.alias))
}

/// `GET /:alias`: redirect to the origin while the link is active.
///
/// Segments that cannot be aliases are looked up as static pages instead.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(short): Path<String>,
    request: Request,
) -> Response {
    if !alias::is_well_formed(&short) {
        return static_handler(State(state), request).await;
    }
    match state.links.lookup(&short) {
        Ok(link) => match HeaderValue::try_from(link.origin.as_str()) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(e) => ServerError::Internal(format!("unusable origin for {short}: {e}"))
                .into_response(),
        },
        Err(e) if e.is_gone() => not_found_page(&state, request, e).await,
        Err(e) => ServerError::from(e).into_response(),
    }
}

/// Any other `GET`: a file from the static directory, or its 404 page.
pub async fn static_handler(State(state): State<AppState>, request: Request) -> Response {
    let Some(dir) = state.static_dir.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let pages = ServeDir::new(dir).not_found_service(ServeFile::new(dir.join(NOT_FOUND_PAGE)));
    match pages.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

async fn not_found_page(state: &AppState, request: Request, err: LinkError) -> Response {
    let Some(dir) = state.static_dir.as_deref() else {
        return ServerError::from(err).into_response();
    };
    let page: Result<_, Infallible> = ServeFile::new(dir.join(NOT_FOUND_PAGE))
        .oneshot(request)
        .await;
    match page {
        Ok(response) => {
            let mut response = response.into_response();
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
        Err(never) => match never {},
    }
}

/// `GET /history`: every link the caller has created.
pub async fn history_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ServerResult<Json<LinkOwnerView>> {
    let owner = client_address(&headers, peer.map(|ConnectInfo(addr)| addr));
    let links = Arc::clone(&state.links);
    let view = tokio::task::spawn_blocking(move || links.owner_view(&owner))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(Json(view))
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "lnk-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
