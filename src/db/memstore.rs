use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::store::{AnnotationStore, StoreError, UserRecord, UserStore};
use crate::models::{Highlight, Note, RoomRecord};

/// In-process store used when no database is configured and in tests.
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemStore {
    rooms: RwLock<HashMap<String, RoomRecord>>,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Insert keeping the sequence ordered by `seq`, ties in arrival order
fn insert_by_seq<T>(items: &mut Vec<T>, item: T, seq_of: impl Fn(&T) -> u64) {
    let seq = seq_of(&item);
    let idx = items.partition_point(|existing| seq_of(existing) <= seq);
    items.insert(idx, item);
}

#[async_trait]
impl AnnotationStore for MemStore {
    async fn ensure_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomRecord::empty(room_id));
        Ok(record.clone())
    }

    async fn append_highlight(&self, room_id: &str, highlight: &Highlight) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomRecord::empty(room_id));
        insert_by_seq(&mut record.highlights, highlight.clone(), |h| h.seq);
        Ok(())
    }

    async fn append_note(&self, room_id: &str, note: &Note) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomRecord::empty(room_id));
        insert_by_seq(&mut record.notes, note.clone(), |n| n.seq);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl UserStore for MemStore {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(StoreError::Conflict(format!("username '{}' is taken", username)));
        }
        let user = UserRecord {
            id: uuid::Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(username.to_string(), user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }
}
