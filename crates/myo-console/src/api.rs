//! REST API endpoints.
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/gallery` - Motion class gallery with its slide and manual commands
//! - `GET /api/state` - Console mirror and message counters
//! - `POST /api/command` - Submit a console frame (plain-text body)
//!
//! Errors are returned as JSON objects with a single `error` field.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use myo_types::{ConsoleState, GalleryEntry};
use serde::Serialize;
use time::OffsetDateTime;

use crate::state::{AppState, StatsSnapshot};

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/gallery", get(get_gallery))
        .route("/api/state", get(get_state))
        .route("/api/command", post(post_command))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// A gallery slide as the console page consumes it.
#[derive(Debug, Serialize)]
pub struct GallerySlide {
    #[serde(flatten)]
    pub entry: GalleryEntry,
    /// Frame sent when the slide becomes current.
    pub slide_command: String,
    /// Frame sent by the matching manual-control button.
    pub manual_command: String,
}

async fn get_gallery(State(state): State<Arc<AppState>>) -> Json<Vec<GallerySlide>> {
    let slides = state
        .gallery
        .iter()
        .map(|entry| GallerySlide {
            slide_command: entry.class_command().encode(),
            manual_command: entry.manual_command().encode(),
            entry: entry.clone(),
        })
        .collect();
    Json(slides)
}

/// Console mirror response.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub console: ConsoleState,
    /// Frames a newly connected console is sent.
    pub replay: Vec<String>,
    pub stats: StatsSnapshot,
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        console: state.snapshot().await,
        replay: state.replay().await,
        stats: state.stats.snapshot(),
    })
}

/// Accepted command response.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub accepted: bool,
    pub tag: String,
}

/// Submit a console frame.
///
/// # Errors
///
/// Returns [`AppError::BadRequest`] for an empty body or a tag that is not a
/// console command.
async fn post_command(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<CommandResponse>), AppError> {
    let frame = body.trim_end_matches(['\r', '\n']);
    if frame.is_empty() {
        return Err(AppError::BadRequest("Command body is empty".to_string()));
    }

    let tag = state
        .submit_command(frame)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CommandResponse {
            accepted: true,
            tag: tag.to_string(),
        }),
    ))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
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

    use crate::config::Config;

    const GALLERY: &str = "\
# classes shown on the training page
class,image
No Movement,img_arm_motions/No_Movement.png
Hand Open,img_grasps/Hand_Open.jpg
";

    fn create_test_state() -> Arc<AppState> {
        let gallery = Gallery::parse_str(GALLERY).unwrap();
        AppState::new(Config::default(), gallery)
    }

    async fn response_body(response: axum::response::Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_text(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "text/plain")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_body(response).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_gallery_endpoint() {
        let state = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/gallery")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_body(response).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let slides = json.as_array().unwrap();

        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1]["class"], "Hand Open");
        assert_eq!(slides[1]["href"], "img_grasps/Hand_Open.jpg");
        assert_eq!(slides[1]["type"], "image/jpeg");
        assert_eq!(slides[1]["slide_command"], "Cls:Hand Open");
        assert_eq!(slides[1]["manual_command"], "Man:Hand Open");
    }

    #[tokio::test]
    async fn test_state_endpoint() {
        let state = create_test_state();
        state.apply_status("strTrainingMotion:No Movement").await;
        let app = router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_body(response).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(
            json["console"]["elements"]["msg_train"]["text"],
            "No Movement"
        );
        assert_eq!(json["replay"][0], "strTrainingMotion:No Movement");
        assert_eq!(json["stats"]["status_applied"], 1);
    }

    #[tokio::test]
    async fn test_post_command_accepted() {
        let state = create_test_state();
        let mut commands = state.commands_tx.subscribe();
        let app = router().with_state(Arc::clone(&state));

        let response = app.oneshot(post_text("/api/command", "Cmd:Train\n")).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = response_body(response).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["accepted"], true);
        assert_eq!(json["tag"], "Cmd");

        assert_eq!(commands.try_recv().unwrap().encode(), "Cmd:Train");
    }

    #[tokio::test]
    async fn test_post_command_unknown_tag() {
        let state = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(post_text("/api/command", "strStatus:spoofed"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_body(response).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("unrecognized tag 'strStatus'")
        );
    }

    #[tokio::test]
    async fn test_post_command_empty_body() {
        let state = create_test_state();
        let app = router().with_state(state);

        let response = app.oneshot(post_text("/api/command", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
