//! Operator console backend for the Myo bridge.
//!
//! This crate serves the browser console and bridges it to the controller:
//! - Serves the console page and its assets from a static directory
//! - Relays console commands from WebSocket clients to the controller over UDP
//! - Broadcasts controller status frames to every connected console
//! - Keeps a mirror of the console so late joiners see the current state
//!
//! # Endpoints
//!
//! - `GET /` - Console page and static assets
//! - `WS /ws` - Command and status stream (`<Tag>:<Payload>` text frames)
//! - `GET /api/health` - Service health check
//! - `GET /api/gallery` - Motion class gallery
//! - `GET /api/state` - Console mirror and counters
//! - `POST /api/command` - Submit a command frame
//!
//! # Configuration
//!
//! The console reads configuration from `~/.config/myo/console.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! static_dir = "www"
//!
//! [controller]
//! command_addr = "127.0.0.1:9100"
//! status_bind = "127.0.0.1:9101"
//!
//! [gallery]
//! path = "gallery.csv"
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod state;
pub mod ws;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::{
    Config, ConfigError, ControllerConfig, GalleryConfig, ServerConfig, ValidationError,
};
pub use controller::{ControllerLink, LinkError};
pub use state::{AppState, ConsoleStats, StatsSnapshot};

/// Build the complete console application.
///
/// Paths not matched by the API or WebSocket routes are served from
/// `static_dir`.
pub fn app(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .merge(api::router())
        .merge(ws::router())
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use myo_types::Gallery;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_serves_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>MiniVIE</h1>").unwrap();

        let state = AppState::new(Config::default(), Gallery::default());
        let response = app(state, dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>MiniVIE</h1>");
    }

    #[tokio::test]
    async fn test_api_routes_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(Config::default(), Gallery::default());

        let response = app(Arc::clone(&state), dir.path())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state, dir.path())
            .oneshot(
                Request::builder()
                    .uri("/missing.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
