//! HTTP API module
//!
//! This module contains the popup-facing HTTP endpoints, the page socket and
//! the response structures.

pub mod handlers;
pub mod responses;
pub mod socket;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;
use socket::page_socket_handler;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/enable", post(enable_handler))
        .route("/disable", post(disable_handler))
        .route("/settings", get(get_settings_handler).put(update_settings_handler))
        .route("/message", post(message_handler))
        .route("/stats", get(stats_handler))
        .route("/errors", get(errors_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/page", get(page_socket_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
