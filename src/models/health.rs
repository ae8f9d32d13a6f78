use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness and readiness body
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Durable store backend, reported by readiness only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}
