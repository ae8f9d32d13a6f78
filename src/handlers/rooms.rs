use crate::{app::AppState, models::{validate_room_id, ErrorResponse, RoomRecord}};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

/// Durable annotation history of a room, created empty if it does not exist.
/// Lets a reconnecting client refill a gap it detected in the event sequence.
pub async fn room_annotations(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomRecord>), (StatusCode, Json<ErrorResponse>)> {
    if let Err(reason) = validate_room_id(&room_id) {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, reason));
    }

    match state.annotations.ensure_room(&room_id).await {
        Ok(record) => {
            info!("Served annotations of room {}", room_id);
            Ok((StatusCode::OK, Json(record)))
        }
        Err(e) => {
            error!("Failed to load room '{}': {}", room_id, e);
            Err(ErrorResponse::reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load room '{}'", room_id),
            ))
        }
    }
}
