//! REST boundary for the chat engine.
//!
//! The chat endpoint always answers at the protocol level: engine errors
//! are logged and mapped to the fallback reply, never to an error body.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::config::BotConfig;
use crate::engine::ConversationEngine;
use crate::error::{ChatError, Error};
use crate::milestones::Milestone;
use crate::profile::ProfileSetup;
use crate::store::Store;
use crate::weight::WeightEntry;

/// Shared state for the chat routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub store: Arc<dyn Store>,
    pub config: BotConfig,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// POST /api/chat
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let reply = match state.engine.handle_message(&req.user_id, &req.message).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(user_id = %req.user_id, error = %e, "Chat turn failed");
            state.config.fallback_reply.clone()
        }
    };
    Json(ChatReply { reply })
}

#[derive(Debug, Deserialize)]
pub struct ProfileSetupRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub setup: ProfileSetup,
}

/// POST /api/profile
async fn setup_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileSetupRequest>,
) -> impl IntoResponse {
    match state.engine.setup_profile(&req.user_id, &req.setup).await {
        Ok(profile) => Json(serde_json::to_value(profile).unwrap_or_default()).into_response(),
        Err(Error::Chat(ChatError::Validation(msg))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": msg })),
        )
            .into_response(),
        Err(e) => {
            error!(user_id = %req.user_id, error = %e, "Profile setup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeightLogRequest {
    pub user_id: String,
    pub weight_kg: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeightLogResponse {
    pub entry: WeightEntry,
    pub unlocked: Vec<Milestone>,
}

/// POST /api/weight — append a log entry and evaluate milestones.
async fn log_weight(
    State(state): State<AppState>,
    Json(req): Json<WeightLogRequest>,
) -> impl IntoResponse {
    match state
        .engine
        .log_weight(&req.user_id, req.weight_kg, req.notes.clone())
        .await
    {
        Ok(outcome) => Json(WeightLogResponse {
            entry: outcome.entry,
            unlocked: outcome.unlocked,
        })
        .into_response(),
        Err(Error::Chat(ChatError::Validation(msg))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": msg })),
        )
            .into_response(),
        Err(Error::Chat(ChatError::ProfileIncomplete { .. })) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": "Complete your profile first." })),
        )
            .into_response(),
        Err(e) => {
            error!(user_id = %req.user_id, error = %e, "Weight log failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// GET /api/profile/{user_id}
async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_profile(&user_id).await {
        Ok(Some(profile)) => {
            Json(serde_json::to_value(profile).unwrap_or_default()).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No profile exists yet" })),
        )
            .into_response(),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Profile lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// GET /api/milestones/{user_id}
async fn get_milestones(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.store.list_milestones(&user_id).await {
        Ok(milestones) => Json(milestones).into_response(),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Milestone lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// Build the chat REST routes.
pub fn chat_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/profile", post(setup_profile))
        .route("/api/profile/{user_id}", get(get_profile))
        .route("/api/weight", post(log_weight))
        .route("/api/milestones/{user_id}", get(get_milestones))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
