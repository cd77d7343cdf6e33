//! Browser UI for triggering an evaluation run.
//!
//! Serves a single page with a login box, a run button, a status textbox and
//! a results table, plus the JSON endpoint the button calls.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{run_and_submit_all, RunOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

const INDEX_HTML: &str = include_str!("index.html");

/// Shared application state.
pub struct AppState {
    settings: Settings,
    /// Held for the duration of a run; runs never overlap.
    run_lock: Mutex<()>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            run_lock: Mutex::new(()),
        }
    }
}

/// Build the UI router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/run", post(run))
        .layer(cors)
        .with_state(state)
}

/// Run the UI server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    log_space_info();

    let state = Arc::new(AppState::new(settings));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("GAIA Evaluation Runner");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("UI", "GET  /");
    Output::kv("Run", "POST /run");
    Output::kv("Health", "GET  /health");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Log where the app is hosted, when running inside a Hugging Face space.
fn log_space_info() {
    match std::env::var("SPACE_HOST") {
        Ok(host) if !host.is_empty() => {
            info!("SPACE_HOST: {}", host);
            info!("Runtime URL: https://{}.hf.space", host);
        }
        _ => info!("SPACE_HOST not set (likely running locally)."),
    }

    match std::env::var("SPACE_ID") {
        Ok(id) if !id.is_empty() => {
            info!("SPACE_ID: {}", id);
            info!("Repo: https://huggingface.co/spaces/{}", id);
        }
        _ => info!("SPACE_ID not set (repo link not available)."),
    }
}

// === Request/Response Types ===

#[derive(Deserialize, Default)]
struct RunRequest {
    /// Username from the login box.
    #[serde(default)]
    username: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn run(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RunRequest>>,
) -> impl IntoResponse {
    let Ok(_guard) = state.run_lock.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A run is already in progress.".to_string(),
            }),
        )
            .into_response();
    };

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let username = request
        .username
        .filter(|u| !u.trim().is_empty())
        .or_else(|| state.settings.submission.username.clone());

    let outcome: RunOutcome = run_and_submit_all(&state.settings, username.as_deref(), None).await;
    Json(outcome).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_has_controls() {
        assert!(INDEX_HTML.contains("Run Evaluation &amp; Submit All Answers"));
        assert!(INDEX_HTML.contains("Run Status / Submission Result"));
        assert!(INDEX_HTML.contains("Questions and Agent Answers"));
        assert!(INDEX_HTML.contains("/run"));
    }

    #[test]
    fn test_run_request_username_optional() {
        let req: RunRequest = serde_json::from_str("{}").unwrap();
        assert!(req.username.is_none());

        let req: RunRequest = serde_json::from_str(r#"{"username": "alice"}"#).unwrap();
        assert_eq!(req.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_run_without_login_returns_login_message() {
        let state = Arc::new(AppState::new(Settings::default()));
        let response = run(State(state), Some(Json(RunRequest::default())))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let outcome: RunOutcome = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(outcome.status, crate::orchestrator::LOGIN_REQUIRED);
        assert!(outcome.results.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_run_rejected() {
        let state = Arc::new(AppState::new(Settings::default()));
        let _held = state.run_lock.lock().await;

        let response = run(State(state.clone()), None).await.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
