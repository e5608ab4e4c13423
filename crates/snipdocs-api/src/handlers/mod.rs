//! Route handlers, grouped by resource

pub mod auth;
pub mod catalog;
pub mod documents;
pub mod engagement;
pub mod profiles;

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::HealthResponse;
use crate::AppState;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.db.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            "degraded"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
