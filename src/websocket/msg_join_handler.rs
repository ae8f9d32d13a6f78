use tracing::{error, info};

use crate::app::AppState;
use crate::models::{
    validate_room_id, DocumentAvailableMessage, InitialDataMessage, JoinMessage, PageChangedMessage, SendMessage,
};
use crate::ws::connctx::ConnId;
use super::relay::RelayError;

/// Handle JoinMessage
///
/// Binds the connection to the room, then hydrates it in two phases: the
/// cached view state first, then the durable annotation history. The two are
/// not a consistent snapshot. An annotation relayed while the history is being
/// read may show up both in `initialData` and as a live event; annotations carry
/// their room `seq` so the client can drop the duplicate.
pub async fn handle_join_message(state: &AppState, conn: ConnId, join_msg: JoinMessage) -> Result<(), RelayError> {
    validate_room_id(&join_msg.room_id).map_err(|reason| RelayError::invalid("join", reason))?;
    let room_id = join_msg.room_id;

    // 1. Bind the connection to the room
    if let Some(previous) = state.mux.join(conn, &room_id).await {
        if previous != room_id {
            info!("Connection {} moved from room {} to {}", conn, previous, room_id);
        }
    }

    // 2. Send the cached document and page, if any
    if let Some(ctx) = state.rooms.get(&room_id) {
        if let Some(url) = ctx.document_url {
            let msg = SendMessage::DocumentAvailable(DocumentAvailableMessage {
                url,
                version: ctx.document_version,
                seq: None,
            });
            state.mux.send_to(conn, &msg).await;
        }
        let msg = SendMessage::PageChanged(PageChangedMessage { page: ctx.page, seq: None });
        state.mux.send_to(conn, &msg).await;
    }

    // 3. Load or create the durable record and send it
    let record = match state.annotations.ensure_room(&room_id).await {
        Ok(record) => record,
        Err(e) => {
            error!("Error loading room data for {}: {}", room_id, e);
            return Ok(());
        }
    };

    // Keep new sequence numbers above anything already persisted
    state.mux.advance_seq(&room_id, record.max_seq()).await;

    info!(
        "Hydrated connection {} in room {} ({} highlights, {} notes)",
        conn,
        room_id,
        record.highlights.len(),
        record.notes.len()
    );
    let msg = SendMessage::InitialData(InitialDataMessage {
        room_id: record.room_id,
        highlights: record.highlights,
        notes: record.notes,
    });
    state.mux.send_to(conn, &msg).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::relay::tests::{state, Peer};
    use crate::app::AppState;
    use crate::config::Config;
    use crate::db::{AnnotationStore, MemStore, StoreError};
    use crate::models::{Highlight, Note, RoomRecord};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn first_join_gets_empty_initial_data_only() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;

        let frames = a.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], json!({"type": "initialData", "roomId": "r1", "highlights": [], "notes": []}));
    }

    #[tokio::test]
    async fn late_joiner_gets_view_state_before_history() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.send(&state, json!({"type": "documentUploaded", "roomId": "r1", "url": "X"})).await;
        a.send(&state, json!({"type": "pageChanged", "roomId": "r1", "page": 7})).await;

        let mut b = Peer::connect(&state).await;
        b.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        let frames = b.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], json!({"type": "documentAvailable", "url": "X", "version": 1}));
        assert_eq!(frames[1], json!({"type": "pageChanged", "page": 7}));
        assert_eq!(frames[2]["type"], "initialData");
    }

    #[tokio::test]
    async fn page_without_document_hydrates_page_only() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.send(&state, json!({"type": "pageChanged", "roomId": "r1", "page": 4})).await;

        let mut b = Peer::connect(&state).await;
        b.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        let frames = b.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], json!({"type": "pageChanged", "page": 4}));
        assert_eq!(frames[1]["type"], "initialData");
    }

    #[tokio::test]
    async fn empty_room_id_is_rejected_without_binding() {
        let state = state();
        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": ""})).await;
        let frames = a.frames();
        assert_eq!(frames[0]["code"], "invalid");
        assert!(state.mux.room_of(a.id).await.is_none());
    }

    #[tokio::test]
    async fn sequence_resumes_after_persisted_history() {
        let store = Arc::new(MemStore::new());
        store
            .append_highlight("r1", &Highlight { x: 0.0, y: 0.0, width: 1.0, height: 1.0, room_id: "r1".into(), seq: 41 })
            .await
            .unwrap();
        let state = AppState::new(Config::default(), store.clone(), store);

        let mut a = Peer::connect(&state).await;
        let mut b = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        b.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.frames();
        b.frames();

        a.send(&state, json!({"type": "cursorMoved", "roomId": "r1", "position": {"x": 1, "y": 1}})).await;
        assert_eq!(b.frames()[0]["seq"], 42);
    }

    struct DownStore;

    #[async_trait]
    impl AnnotationStore for DownStore {
        async fn ensure_room(&self, _room_id: &str) -> Result<RoomRecord, StoreError> {
            Err(StoreError::Unavailable("database is down".into()))
        }

        async fn append_highlight(&self, _room_id: &str, _highlight: &Highlight) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("database is down".into()))
        }

        async fn append_note(&self, _room_id: &str, _note: &Note) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("database is down".into()))
        }

        fn backend(&self) -> &'static str {
            "down"
        }
    }

    #[tokio::test]
    async fn store_failure_on_join_is_swallowed() {
        let state = AppState::new(Config::default(), Arc::new(DownStore), Arc::new(MemStore::new()));
        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;

        // Bound, but no history and no error frame
        assert_eq!(state.mux.room_of(a.id).await.as_deref(), Some("r1"));
        assert!(a.frames().is_empty());
    }

    /// Holds one `ensure_room` call open until released.
    struct GatedStore {
        inner: MemStore,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl AnnotationStore for GatedStore {
        async fn ensure_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.ensure_room(room_id).await
        }

        async fn append_highlight(&self, room_id: &str, highlight: &Highlight) -> Result<(), StoreError> {
            self.inner.append_highlight(room_id, highlight).await
        }

        async fn append_note(&self, room_id: &str, note: &Note) -> Result<(), StoreError> {
            self.inner.append_note(room_id, note).await
        }

        fn backend(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn highlight_during_history_load_reaches_joiner_with_snapshot_seq() {
        let store = Arc::new(GatedStore {
            inner: MemStore::new(),
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let state = AppState::new(Config::default(), store.clone(), Arc::new(MemStore::new()));

        let mut a = Peer::connect(&state).await;
        a.send(&state, json!({"type": "join", "roomId": "r1"})).await;
        a.frames();

        let mut b = Peer::connect(&state).await;
        store.armed.store(true, Ordering::SeqCst);
        tokio::join!(
            b.send(&state, json!({"type": "join", "roomId": "r1"})),
            async {
                // B is bound and its history read is in flight
                store.entered.notified().await;
                a.send(&state, json!({"type": "highlightAdded", "roomId": "r1",
                    "highlight": {"x": 1, "y": 2, "width": 3, "height": 4}})).await;
                state.persist.flush().await;
                store.release.notify_one();
            }
        );

        let frames = b.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "highlightAdded");
        assert_eq!(frames[1]["type"], "initialData");
        // Same event twice; the shared seq lets the client drop one
        let live_seq = frames[0]["seq"].clone();
        assert_eq!(frames[1]["highlights"].as_array().unwrap().len(), 1);
        assert_eq!(frames[1]["highlights"][0]["seq"], live_seq);
    }
}
