use tracing::debug;

use crate::app::AppState;
use crate::models::{PageChangeMessage, PageChangedMessage, SendMessage};
use crate::ws::connctx::ConnId;
use super::relay::{bound_room, RelayError};

/// Handle PageChangeMessage
pub async fn handle_page_message(state: &AppState, conn: ConnId, page_msg: PageChangeMessage) -> Result<(), RelayError> {
    if page_msg.page < 1 {
        return Err(RelayError::invalid("pageChanged", "page must be 1 or greater"));
    }
    let room_id = bound_room(state, conn, &page_msg.room_id).await?;

    // 1. Update the room cache
    state.rooms.set_page(&room_id, page_msg.page);
    debug!("Room {} moved to page {}", room_id, page_msg.page);

    // 2. Broadcast to the rest of the room
    let page = page_msg.page;
    state
        .mux
        .broadcast_to_others(&room_id, conn, |seq| {
            SendMessage::PageChanged(PageChangedMessage { page, seq: Some(seq) })
        })
        .await;

    Ok(())
}
