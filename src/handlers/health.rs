use axum::{extract::State, Json};
use std::sync::Arc;
use crate::app::AppState;
use crate::models::HealthResponse;
use tracing::debug;

/// Liveness: the process is serving requests
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        store: None,
    })
}

/// Readiness, with the store backend the relay persists to
pub async fn ready_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (n_conn, n_rooms) = state.mux.stats().await;
    debug!("Readiness check requested ({} connections in {} rooms)", n_conn, n_rooms);
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Relaying {} connection(s) in {} room(s)", n_conn, n_rooms),
        store: Some(state.annotations.backend().to_string()),
    })
}
