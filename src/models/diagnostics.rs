use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for diagnostics information
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub n_conn: u32,
    pub n_rooms: u32,
    pub n_cached_rooms: u64,
    pub n_persisted: u64,
    pub n_persist_retries: u64,
    pub n_persist_failures: u64,
    pub n_persist_pending: u64,
    pub store_backend: String,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
