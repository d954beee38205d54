//! HTTP server for lnk.
//!
//! Thin axum surface over a [`LinkStore`](lnk_core::LinkStore): create a
//! short link, follow it, list the caller's links. Callers are identified by
//! their address, taken from proxy headers when present.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use client::client_address;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::LnkServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use lnk_core::{LinkStore, LinkStoreConfig};
    use lnk_store::RecordStore;
    use lnk_types::LinkOwnerView;
    use tower::util::ServiceExt;

    const DOMAIN: &str = "https://s.example";

    fn app() -> (Router, Arc<LinkStore>) {
        let links = Arc::new(
            LinkStore::open(Arc::new(RecordStore::in_memory()), LinkStoreConfig::default()).unwrap(),
        );
        let app = router::build_router(AppState::new(Arc::clone(&links), DOMAIN));
        (app, links)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn create(query: &str, client: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/?{query}"))
            .header("x-real-ip", client)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (app, _) = app();
        let response = send(&app, get("/v1/health")).await;
        assert_eq!(response.status(), 200);
        assert!(body_text(response).await.contains("\"ok\""));
    }

    #[tokio::test]
    async fn create_then_follow() {
        let (app, _) = app();
        let response = send(&app, create("origin=https://a.example/page&ttl=60", "10.0.0.1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let short = body_text(response).await;
        let alias = short.strip_prefix("https://s.example/").unwrap().to_string();
        assert_eq!(alias.len(), 5);

        let response = send(&app, get(&format!("/{alias}"))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://a.example/page"
        );

        let again = send(&app, create("origin=https://a.example/page&ttl=5", "10.0.0.2")).await;
        assert_eq!(body_text(again).await, short);
    }

    #[tokio::test]
    async fn rejects_bad_create_requests() {
        let (app, links) = app();
        for query in [
            "ttl=60",
            "origin=https://a.example",
            "origin=https://a.example&ttl=soon",
            "origin=https://a.example&ttl=1.5",
            "origin=&ttl=60",
            "origin=https://a.example/%7F&ttl=60",
        ] {
            let response = send(&app, create(query, "10.0.0.1")).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
        }
        assert!(links.records().is_empty().unwrap());
    }

    #[tokio::test]
    async fn non_positive_ttl_keeps_link_indefinitely() {
        let (app, links) = app();
        for (i, ttl) in ["-1", "0"].into_iter().enumerate() {
            let query = format!("origin=https://keep{i}.example&ttl={ttl}");
            let response = send(&app, create(&query, "10.0.0.1")).await;
            assert_eq!(response.status(), StatusCode::OK, "{ttl}");

            let short = body_text(response).await;
            let alias = short.strip_prefix("https://s.example/").unwrap();
            let left = links.remaining(alias).unwrap();
            assert!(left > Duration::from_secs(365 * 24 * 3600), "{ttl}: {left:?}");
            assert!(left <= links.config().max_ttl);
        }
    }

    fn app_with_pages() -> (Router, Arc<LinkStore>, tempfile::TempDir) {
        let pages = tempfile::tempdir().unwrap();
        std::fs::write(pages.path().join("index.html"), "<h1>lnk</h1>").unwrap();
        std::fs::write(pages.path().join("main.js"), "// form").unwrap();
        std::fs::write(pages.path().join("404.html"), "<h1>gone</h1>").unwrap();

        let links = Arc::new(
            LinkStore::open(Arc::new(RecordStore::in_memory()), LinkStoreConfig::default()).unwrap(),
        );
        let state = AppState::new(Arc::clone(&links), DOMAIN).with_static_dir(pages.path());
        (router::build_router(state), links, pages)
    }

    #[tokio::test]
    async fn serves_static_pages_for_non_alias_paths() {
        let (app, _, _pages) = app_with_pages();

        let response = send(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>lnk</h1>");

        let response = send(&app, get("/main.js")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "// form");

        let response = send(&app, get("/assets/missing.css")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "<h1>gone</h1>");
    }

    #[tokio::test]
    async fn gone_alias_gets_not_found_page() {
        let (app, links, _pages) = app_with_pages();
        let link = links
            .create_or_revive("https://a.example", "10.0.0.1", Duration::from_millis(30))
            .unwrap();
        let uri = format!("/{}", link.alias);
        assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::FOUND);

        tokio::time::sleep(Duration::from_millis(200)).await;
        for uri in [uri.as_str(), "/zzzzz"] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body_text(response).await, "<h1>gone</h1>");
        }
    }

    #[tokio::test]
    async fn unknown_and_malformed_aliases_are_404() {
        let (app, _) = app();
        assert_eq!(send(&app, get("/zzzzz")).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&app, get("/ab")).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&app, get("/ab-cd")).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn expired_alias_is_404_until_revived() {
        let (app, links) = app();
        let link = links
            .create_or_revive("https://a.example", "10.0.0.1", Duration::from_millis(30))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let uri = format!("/{}", link.alias);
        assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::NOT_FOUND);

        let response = send(&app, create("origin=https://a.example&ttl=60", "10.0.0.1")).await;
        assert_eq!(body_text(response).await, format!("{DOMAIN}/{}", link.alias));
        assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn history_lists_callers_links() {
        let (app, _) = app();
        send(&app, create("origin=https://a.example&ttl=60", "10.0.0.1")).await;
        send(&app, create("origin=https://b.example&ttl=60", "10.0.0.2")).await;
        send(&app, create("origin=https://c.example&ttl=60", "10.0.0.1")).await;

        let request = Request::builder()
            .uri("/history")
            .header("x-forwarded-for", "10.0.0.1, 172.16.0.1")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let view: LinkOwnerView = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(view.owner, "10.0.0.1");
        let origins: Vec<&str> = view.links.iter().map(|l| l.origin.as_str()).collect();
        assert_eq!(origins, vec!["https://a.example", "https://c.example"]);
    }
}
