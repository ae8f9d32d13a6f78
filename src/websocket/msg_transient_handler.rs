use chrono::Utc;

use crate::app::AppState;
use crate::models::{
    ChatBroadcastMessage, ChatMessage, CursorBroadcastMessage, CursorMessage, SendMessage, MAX_NOTE_TEXT_LEN,
};
use crate::ws::connctx::ConnId;
use super::relay::{bound_room, RelayError};

// Chat and cursor events are relayed only; nothing is cached or stored.

/// Handle ChatMessage
pub async fn handle_chat_message(state: &AppState, conn: ConnId, chat_msg: ChatMessage) -> Result<(), RelayError> {
    if chat_msg.text.len() > MAX_NOTE_TEXT_LEN {
        return Err(RelayError::invalid("chatMessage", format!("text exceeds {} bytes", MAX_NOTE_TEXT_LEN)));
    }
    let room_id = bound_room(state, conn, &chat_msg.room_id).await?;

    let sent_at = Utc::now().to_rfc3339();
    state
        .mux
        .broadcast_to_others(&room_id, conn, |seq| {
            SendMessage::Chat(ChatBroadcastMessage {
                text: chat_msg.text,
                author: chat_msg.author,
                sent_at,
                connection_id: conn.to_string(),
                seq,
            })
        })
        .await;

    Ok(())
}

/// Handle CursorMessage
pub async fn handle_cursor_message(state: &AppState, conn: ConnId, cursor_msg: CursorMessage) -> Result<(), RelayError> {
    if !cursor_msg.position.x.is_finite() || !cursor_msg.position.y.is_finite() {
        return Err(RelayError::invalid("cursorMoved", "position must be finite"));
    }
    let room_id = bound_room(state, conn, &cursor_msg.room_id).await?;

    state
        .mux
        .broadcast_to_others(&room_id, conn, |seq| {
            SendMessage::CursorMoved(CursorBroadcastMessage {
                position: cursor_msg.position,
                user: cursor_msg.user,
                connection_id: conn.to_string(),
                seq,
            })
        })
        .await;

    Ok(())
}
