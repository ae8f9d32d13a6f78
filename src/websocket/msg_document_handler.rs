use tracing::info;

use crate::app::AppState;
use crate::models::{DocumentAvailableMessage, DocumentUploadedMessage, SendMessage};
use crate::ws::connctx::ConnId;
use super::relay::{bound_room, RelayError};

/// Handle DocumentUploadedMessage
///
/// Concurrent uploads to one room resolve last-write-wins in the cache. Each
/// write gets a new document version, and peers receive it with the
/// announcement so a late, older announcement can be ignored.
pub async fn handle_document_message(
    state: &AppState,
    conn: ConnId,
    doc_msg: DocumentUploadedMessage,
) -> Result<(), RelayError> {
    if doc_msg.url.trim().is_empty() {
        return Err(RelayError::invalid("documentUploaded", "url must not be empty"));
    }
    let room_id = bound_room(state, conn, &doc_msg.room_id).await?;

    // 1. Save to the room cache
    let ctx = state.rooms.set_document(&room_id, &doc_msg.url);
    info!("Room {} switched to document {} (version {})", room_id, doc_msg.url, ctx.document_version);

    // 2. Broadcast to the rest of the room
    let url = doc_msg.url;
    state
        .mux
        .broadcast_to_others(&room_id, conn, |seq| {
            SendMessage::DocumentAvailable(DocumentAvailableMessage {
                url,
                version: ctx.document_version,
                seq: Some(seq),
            })
        })
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::relay::tests::{state, Peer};
    use serde_json::json;

    #[tokio::test]
    async fn upload_is_cached_and_relayed_to_others() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        let mut b = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        b.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.frames();
        b.frames();

        a.send(&state, json!({"type": "documentUploaded", "roomId": "r1", "url": "http://x/doc.pdf"})).await;

        let frames = b.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "documentAvailable");
        assert_eq!(frames[0]["url"], "http://x/doc.pdf");
        assert_eq!(frames[0]["version"], 1);
        assert!(a.frames().is_empty());

        let ctx = state.rooms.get("r1").unwrap();
        assert_eq!(ctx.document_url.as_deref(), Some("http://x/doc.pdf"));
        assert_eq!(ctx.page, 1);
    }

    #[tokio::test]
    async fn second_upload_wins_with_higher_version() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        let mut b = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        b.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.frames();
        b.frames();

        a.send(&state, json!({"type": "documentUploaded", "roomId": "r1", "url": "http://x/one.pdf"})).await;
        b.send(&state, json!({"type": "documentUploaded", "roomId": "r1", "url": "http://x/two.pdf"})).await;

        assert_eq!(a.frames()[0]["version"], 2);
        assert_eq!(b.frames()[0]["version"], 1);
        assert_eq!(state.rooms.get("r1").unwrap().document_url.as_deref(), Some("http://x/two.pdf"));
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.frames();
        a.send(&state, json!({"type": "documentUploaded", "roomId": "r1", "url": " "})).await;
        assert_eq!(a.frames()[0]["code"], "invalid");
        assert!(state.rooms.get("r1").is_none());
    }
}
