use thiserror::Error;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::models::{ErrorMessage, ReceivedMessage, SendMessage};
use crate::ws::connctx::ConnId;
use super::msg_annotation_handler::{handle_highlight_message, handle_note_message};
use super::msg_document_handler::handle_document_message;
use super::msg_join_handler::handle_join_message;
use super::msg_page_handler::handle_page_message;
use super::msg_ping_handler::handle_ping_message;
use super::msg_transient_handler::{handle_chat_message, handle_cursor_message};

/// Why an inbound event was rejected. Reported only to its sender.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid {event}: {reason}")]
    Invalid { event: &'static str, reason: String },
    #[error("connection has not joined a room")]
    NotJoined,
    #[error("event addressed to room '{requested}' but connection is in room '{bound}'")]
    RoomMismatch { bound: String, requested: String },
}

impl RelayError {
    pub fn invalid(event: &'static str, reason: impl Into<String>) -> Self {
        RelayError::Invalid { event, reason: reason.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Malformed(_) => "malformed",
            RelayError::Invalid { .. } => "invalid",
            RelayError::NotJoined => "not_joined",
            RelayError::RoomMismatch { .. } => "room_mismatch",
        }
    }
}

/// Process one text frame from `conn`.
pub async fn handle_frame(state: &AppState, conn: ConnId, text: &str) {
    let result = match serde_json::from_str::<ReceivedMessage>(text) {
        Ok(msg) => {
            debug!("Received {} from connection {} (room {:?})", msg.kind(), conn, msg.room_id());
            dispatch(state, conn, msg).await
        }
        Err(e) => Err(RelayError::Malformed(e)),
    };

    if let Err(e) = result {
        warn!("Rejected event from connection {}: {}", conn, e);
        let reply = SendMessage::Error(ErrorMessage {
            code: e.code().to_string(),
            message: e.to_string(),
        });
        state.mux.send_to(conn, &reply).await;
    }
}

pub async fn dispatch(state: &AppState, conn: ConnId, msg: ReceivedMessage) -> Result<(), RelayError> {
    match msg {
        ReceivedMessage::Join(m) => handle_join_message(state, conn, m).await,
        ReceivedMessage::DocumentUploaded(m) => handle_document_message(state, conn, m).await,
        ReceivedMessage::PageChanged(m) => handle_page_message(state, conn, m).await,
        ReceivedMessage::HighlightAdded(m) => handle_highlight_message(state, conn, m).await,
        ReceivedMessage::NoteAdded(m) => handle_note_message(state, conn, m).await,
        ReceivedMessage::Chat(m) => handle_chat_message(state, conn, m).await,
        ReceivedMessage::CursorMoved(m) => handle_cursor_message(state, conn, m).await,
        ReceivedMessage::Ping(m) => handle_ping_message(state, conn, m).await,
    }
}

/// The room `conn` is bound to, provided it is the one the event names.
pub async fn bound_room(state: &AppState, conn: ConnId, requested: &str) -> Result<String, RelayError> {
    match state.mux.room_of(conn).await {
        None => Err(RelayError::NotJoined),
        Some(bound) if bound == requested => Ok(bound),
        Some(bound) => Err(RelayError::RoomMismatch {
            bound,
            requested: requested.to_string(),
        }),
    }
}
