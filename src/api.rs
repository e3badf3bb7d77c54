//! HTTP API for the host.
//!
//! Exposes the engine's start/stop and status queries. Every request goes through
//! the engine's event queue like chat does.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::{QuizHandle, QuizStatus};
use crate::store::{ScoreStore, ScoreTable};

#[derive(Clone)]
pub struct ApiState {
    pub quiz: QuizHandle,
    pub scores: Arc<dyn ScoreStore>,
}

/// Response for start/stop
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub handled: bool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .route("/api/scores", get(scores))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn engine_gone() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Quiz engine is not running").into_response()
}

/// GET /api/status
pub async fn status(State(state): State<ApiState>) -> Result<Json<QuizStatus>, Response> {
    state.quiz.status().await.map(Json).ok_or_else(engine_gone)
}

/// POST /api/start
pub async fn start(State(state): State<ApiState>) -> Response {
    if state.quiz.start() {
        Json(CommandResponse { handled: true }).into_response()
    } else {
        engine_gone()
    }
}

/// POST /api/stop
pub async fn stop(State(state): State<ApiState>) -> Response {
    if state.quiz.stop() {
        Json(CommandResponse { handled: true }).into_response()
    } else {
        engine_gone()
    }
}

/// GET /api/scores
pub async fn scores(State(state): State<ApiState>) -> Result<Json<ScoreTable>, Response> {
    match state.scores.read_all().await {
        Ok(table) => Ok(Json(table)),
        Err(e) => {
            tracing::error!("Failed to read scores: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to read scores: {}", e))
                .into_response())
        }
    }
}
