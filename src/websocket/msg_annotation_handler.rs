use tracing::debug;

use crate::app::AppState;
use crate::models::{HighlightAddedMessage, HighlightMessage, NoteAddedMessage, NoteMessage, SendMessage};
use crate::ws::connctx::ConnId;
use super::relay::{bound_room, RelayError};

/// Handle HighlightMessage
///
/// Peers get the highlight right away; the durable append is queued behind
/// the broadcast and its outcome never reaches the sender.
pub async fn handle_highlight_message(
    state: &AppState,
    conn: ConnId,
    highlight_msg: HighlightMessage,
) -> Result<(), RelayError> {
    highlight_msg
        .highlight
        .validate()
        .map_err(|reason| RelayError::invalid("highlightAdded", reason))?;
    let room_id = bound_room(state, conn, &highlight_msg.room_id).await?;

    let mut highlight = highlight_msg.highlight;
    highlight.room_id = room_id.clone();

    let sent = state
        .mux
        .broadcast_to_others(&room_id, conn, |seq| {
            let mut highlight = highlight.clone();
            highlight.seq = seq;
            SendMessage::HighlightAdded(HighlightAddedMessage { highlight, seq })
        })
        .await;

    highlight.seq = sent.seq;
    debug!("Highlight {} in room {} relayed to {} peer(s)", sent.seq, room_id, sent.delivered);
    state.persist.append_highlight(&room_id, highlight);

    Ok(())
}

/// Handle NoteMessage, same ordering as highlights
pub async fn handle_note_message(state: &AppState, conn: ConnId, note_msg: NoteMessage) -> Result<(), RelayError> {
    note_msg
        .note
        .validate()
        .map_err(|reason| RelayError::invalid("noteAdded", reason))?;
    let room_id = bound_room(state, conn, &note_msg.room_id).await?;

    let mut note = note_msg.note;
    let sent = state
        .mux
        .broadcast_to_others(&room_id, conn, |seq| {
            let mut note = note.clone();
            note.seq = seq;
            SendMessage::NoteAdded(NoteAddedMessage { note, seq })
        })
        .await;

    note.seq = sent.seq;
    debug!("Note {} in room {} relayed to {} peer(s)", sent.seq, room_id, sent.delivered);
    state.persist.append_note(&room_id, note);

    Ok(())
}
