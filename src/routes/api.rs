use crate::{app::AppState, config::Config, handlers::*};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route(
            "/upload",
            post(upload_document).layer(DefaultBodyLimit::max(config.upload_max_bytes)),
        )
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/rooms/:room_id/annotations", get(room_annotations))
}
