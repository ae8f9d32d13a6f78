use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Highlight, Note, RoomRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only annotation history, one record per room.
///
/// Highlights and notes come back ordered by their room sequence number, so the
/// stored order is the order in which the relay issued them even when writes
/// complete out of order.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Find the record for `room_id`, creating an empty one if absent.
    async fn ensure_room(&self, room_id: &str) -> Result<RoomRecord, StoreError>;

    /// Append a highlight, creating the room record if needed.
    async fn append_highlight(&self, room_id: &str, highlight: &Highlight) -> Result<(), StoreError>;

    /// Append a note, creating the room record if needed.
    async fn append_note(&self, room_id: &str, note: &Note) -> Result<(), StoreError>;

    /// Short name of the backend, reported by diagnostics
    fn backend(&self) -> &'static str;
}

/// User row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken username yields `StoreError::Conflict`.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}
