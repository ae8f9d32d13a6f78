use crate::{app::AppState, models::DiagnosticsResponse};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Report live connection, cache and persistence counters
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<DiagnosticsResponse>) {

    let (n_conn, n_rooms) = state.mux.stats().await;
    let n_cached_rooms = state.rooms.entry_count();
    let persist = state.persist.stats();

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Rooms: {}, Dropped writes: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_rooms,
        persist.failures
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: n_conn as u32,
            n_rooms: n_rooms as u32,
            n_cached_rooms,
            n_persisted: persist.persisted,
            n_persist_retries: persist.retries,
            n_persist_failures: persist.failures,
            n_persist_pending: persist.pending,
            store_backend: state.annotations.backend().to_string(),
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
