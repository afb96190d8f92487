//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::Value;
use tracing::{error, info, warn};

use super::responses::{ApiResponse, HealthResponse, StatusResponse};
use crate::{
    messages::{Message, Reply},
    services::error_log::ErrorRecord,
    state::{AppState, Settings, SettingsPatch, Stats},
};

/// Parse an action-tagged message and dispatch it. Unparseable messages
/// count as message failures.
pub async fn dispatch_value(state: &AppState, value: Value) -> Reply {
    match serde_json::from_value::<Message>(value) {
        Ok(message) => state.dispatch(message).await,
        Err(e) => {
            warn!("Rejected message: {}", e);
            state.count_message_failure().await;
            Reply::failure(format!("invalid message: {}", e))
        }
    }
}

async fn toggle(
    state: &AppState,
    status: bool,
) -> Result<Json<ApiResponse>, (StatusCode, Json<Reply>)> {
    let reply = state.dispatch(Message::ToggleEnable { status }).await;
    if !reply.success {
        error!("Failed to set enabled state to {}: {:?}", status, reply.error);
        return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(reply)));
    }

    let message = if status {
        "Eye break reminders enabled"
    } else {
        "Eye break reminders disabled"
    };
    info!("{}", message);
    Ok(Json(ApiResponse::from_state(message.to_string(), state.snapshot().await)))
}

/// Handle POST /enable - Turn reminders on
pub async fn enable_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse>, (StatusCode, Json<Reply>)> {
    toggle(&state, true).await
}

/// Handle POST /disable - Turn reminders off
pub async fn disable_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse>, (StatusCode, Json<Reply>)> {
    toggle(&state, false).await
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings().await)
}

/// Handle PUT /settings - Validate, save and apply new settings
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<ApiResponse>, (StatusCode, Json<Reply>)> {
    let reply = state.dispatch(Message::UpdateSettings { settings: patch }).await;
    if !reply.success {
        warn!("Settings rejected: {:?}", reply.error);
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(reply)));
    }

    Ok(Json(ApiResponse::from_state(
        "Settings saved".to_string(),
        state.snapshot().await,
    )))
}

/// Handle POST /message - Generic action-tagged message
pub async fn message_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Json<Reply> {
    Json(dispatch_value(&state, body).await)
}

/// Handle GET /stats - Today's counters
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(state.snapshot().await.stats)
}

/// Handle GET /errors - Recorded errors, oldest first
pub async fn errors_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ErrorRecord>>, StatusCode> {
    match state.errors().await {
        Ok(errors) => Ok(Json(errors)),
        Err(e) => {
            error!("Failed to read error log: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /status - Return current reminder status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        state: state.snapshot().await,
        pages: state.pages.list(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
