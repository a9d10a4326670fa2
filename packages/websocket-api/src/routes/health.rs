use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub waiting: usize,
    pub matching: usize,
    pub active_duels: usize,
    pub connections: usize,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint with a snapshot of matchmaking load
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let stats = state.coordinator.stats().await;

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            waiting: stats.waiting,
            matching: stats.matching,
            active_duels: stats.active_duels,
            connections: state.hub.connection_count(),
            timestamp: Utc::now(),
        }),
    )
}
