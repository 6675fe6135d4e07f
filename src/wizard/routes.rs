//! REST endpoints that expose wizard sessions to a presentation layer.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::warn;

use super::manager::WizardSessions;
use super::model::AnswerUpdate;
use super::steps::StepId;
use crate::store::SettingsRecordSink;

/// Shared state for wizard routes.
#[derive(Clone)]
pub struct WizardRouteState {
    pub sessions: Arc<WizardSessions>,
    pub areas: Arc<SettingsRecordSink>,
}

/// Build the wizard REST routes.
pub fn wizard_routes(state: WizardRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users/{user_id}/wizard", get(get_wizard))
        .route("/api/users/{user_id}/wizard/answers", post(post_answer))
        .route("/api/users/{user_id}/wizard/advance", post(advance))
        .route("/api/users/{user_id}/wizard/back", post(back))
        .route("/api/users/{user_id}/wizard/jump", post(jump))
        .route("/api/users/{user_id}/areas", get(list_areas))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "planting-wizard"
    }))
}

// ── Wizard ──────────────────────────────────────────────────────────────

async fn get_wizard(
    State(state): State<WizardRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let status = state.sessions.session(&user_id).await.get_status().await;
    Json(status)
}

async fn post_answer(
    State(state): State<WizardRouteState>,
    Path(user_id): Path<String>,
    Json(update): Json<AnswerUpdate>,
) -> impl IntoResponse {
    let status = state.sessions.session(&user_id).await.mutate(update).await;
    Json(status)
}

/// POST /api/users/{user_id}/wizard/advance
///
/// 200 when the wizard moved or completed, 422 when validation blocked it.
/// Both carry the full response body.
async fn advance(
    State(state): State<WizardRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let response = state.sessions.session(&user_id).await.advance().await;
    let code = if response.is_blocked() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    (code, Json(response))
}

async fn back(
    State(state): State<WizardRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let status = state.sessions.session(&user_id).await.retreat().await;
    Json(status)
}

#[derive(Deserialize)]
struct JumpRequest {
    step: StepId,
}

async fn jump(
    State(state): State<WizardRouteState>,
    Path(user_id): Path<String>,
    Json(body): Json<JumpRequest>,
) -> impl IntoResponse {
    let status = state.sessions.session(&user_id).await.jump(body.step).await;
    Json(status)
}

// ── Areas ───────────────────────────────────────────────────────────────

async fn list_areas(
    State(state): State<WizardRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.areas.list_areas(&user_id).await {
        Ok(areas) => (StatusCode::OK, Json(serde_json::json!(areas))),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to list planting areas");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to load planting areas"})),
            )
        }
    }
}
