//! Axum web form.
//!
//! ```text
//! GET  /              form
//! POST /              form submission (urlencoded, repeated `platforms`)
//! POST /api/generate  JSON variant of the form
//! GET  /api/health
//! ```

mod page;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use page::{escape, render_page, FormState, Outcome, INFO_MESSAGE, SUCCESS_MESSAGE};

use crate::writer::{ContentGenerator, GenerateRequest, Platform};
use crate::WriterError;

/// Router state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ContentGenerator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form).post(submit))
        .route("/api/generate", post(api_generate))
        .route("/api/health", get(health))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {bind_addr}: {e}"))?;

    info!(%bind_addr, "web form listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("web form shut down");
    Ok(())
}

async fn form() -> Html<String> {
    Html(render_page(&FormState::default(), &Outcome::Info))
}

/// Parse a urlencoded body; checkboxes arrive as repeated `platforms` keys
pub fn parse_form(body: &[u8]) -> FormState {
    let mut state = FormState {
        video_id: String::new(),
        platforms: Vec::new(),
        query: String::new(),
    };

    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "video_id" => state.video_id = value.trim().to_string(),
            "query" => state.query = value.into_owned(),
            "platforms" => match value.parse::<Platform>() {
                Ok(platform) if !state.platforms.contains(&platform) => state.platforms.push(platform),
                Ok(_) => {}
                Err(e) => warn!("ignoring form field: {e}"),
            },
            _ => {}
        }
    }
    state
}

async fn submit(State(state): State<AppState>, body: axum::body::Bytes) -> Html<String> {
    let form = parse_form(&body);

    if form.video_id.is_empty() || form.platforms.is_empty() {
        return Html(render_page(&form, &Outcome::Info));
    }

    let request = GenerateRequest {
        video: form.video_id.clone(),
        platforms: form.platforms.clone(),
        query: Some(form.query.clone()),
        languages: Vec::new(),
    };

    let outcome = match state.generator.generate(request).await {
        Ok(results) => Outcome::Results(results),
        Err(e) => {
            warn!(video_id = %form.video_id, error = %e, "content generation failed");
            Outcome::Error(e.to_string())
        }
    };

    Html(render_page(&form, &outcome))
}

async fn api_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected api generate body");
            return json_error(StatusCode::BAD_REQUEST, "invalid_request", &rejection.body_text());
        }
    };

    match state.generator.generate(request).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))).into_response(),
        Err(e) => {
            let (status, code) = match &e {
                WriterError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
                WriterError::Transcript(_) => (StatusCode::BAD_GATEWAY, "transcript_error"),
                WriterError::Agent(_) => (StatusCode::BAD_GATEWAY, "agent_error"),
            };
            warn!(error = %e, "api generate failed");
            json_error(status, code, &e.to_string())
        }
    }
}

fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
