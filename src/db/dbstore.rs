use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Error as SqlxError, Postgres, Transaction};
use std::time::Duration;
use tracing::{error, info};

use crate::db::store::{AnnotationStore, StoreError, UserRecord, UserStore};
use crate::models::{Highlight, Note, RoomRecord};

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS rooms (
        room_id TEXT PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS room_highlights (
        id BIGSERIAL PRIMARY KEY,
        room_id TEXT NOT NULL REFERENCES rooms(room_id),
        seq BIGINT NOT NULL,
        x DOUBLE PRECISION NOT NULL,
        y DOUBLE PRECISION NOT NULL,
        width DOUBLE PRECISION NOT NULL,
        height DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE INDEX IF NOT EXISTS room_highlights_room_seq ON room_highlights (room_id, seq);

    CREATE TABLE IF NOT EXISTS room_notes (
        id BIGSERIAL PRIMARY KEY,
        room_id TEXT NOT NULL REFERENCES rooms(room_id),
        seq BIGINT NOT NULL,
        x DOUBLE PRECISION NOT NULL,
        y DOUBLE PRECISION NOT NULL,
        text TEXT NOT NULL,
        author TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE INDEX IF NOT EXISTS room_notes_room_seq ON room_notes (room_id, seq);

    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    );
"#;

/// Highlight row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct HighlightRow {
    room_id: String,
    seq: i64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<HighlightRow> for Highlight {
    fn from(row: HighlightRow) -> Self {
        Highlight {
            x: row.x,
            y: row.y,
            width: row.width,
            height: row.height,
            room_id: row.room_id,
            seq: row.seq as u64,
        }
    }
}

/// Note row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct NoteRow {
    seq: i64,
    x: f64,
    y: f64,
    text: String,
    author: String,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            x: row.x,
            y: row.y,
            text: row.text,
            author: row.author,
            seq: row.seq as u64,
        }
    }
}

/// PostgreSQL backed annotation and user store
pub struct DbStore {
    pool: PgPool,
}

impl DbStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Connect and make sure the schema exists
    pub async fn open(database_url: &str) -> Result<Self, SqlxError> {
        let store = Self::new(database_url).await?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the tables if they do not exist yet
    pub async fn init_schema(&self) -> Result<(), SqlxError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        info!("Database schema ready");
        Ok(())
    }

    async fn begin(&self, what: &str, room_id: &str) -> Result<Transaction<'_, Postgres>, SqlxError> {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "{} for room {}. Pool connections: {} idle, {} in use",
            what,
            room_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );

        match self.pool.begin().await {
            Ok(tx) => Ok(tx),
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool for room {}: {}. Pool state: {} idle, {} total",
                    room_id,
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                Err(e)
            }
        }
    }

    async fn upsert_room(tx: &mut Transaction<'_, Postgres>, room_id: &str) -> Result<(), SqlxError> {
        sqlx::query("INSERT INTO rooms (room_id) VALUES ($1) ON CONFLICT (room_id) DO NOTHING")
            .bind(room_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AnnotationStore for DbStore {
    async fn ensure_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
        let mut tx = self.begin("Ensuring room record", room_id).await?;

        Self::upsert_room(&mut tx, room_id).await?;

        let highlights = sqlx::query_as::<_, HighlightRow>(
            r#"
            SELECT room_id, seq, x, y, width, height
            FROM room_highlights
            WHERE room_id = $1
            ORDER BY seq, id
            "#,
        )
        .bind(room_id)
        .fetch_all(&mut *tx)
        .await?;

        let notes = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT seq, x, y, text, author
            FROM room_notes
            WHERE room_id = $1
            ORDER BY seq, id
            "#,
        )
        .bind(room_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RoomRecord {
            room_id: room_id.to_string(),
            highlights: highlights.into_iter().map(Highlight::from).collect(),
            notes: notes.into_iter().map(Note::from).collect(),
        })
    }

    async fn append_highlight(&self, room_id: &str, highlight: &Highlight) -> Result<(), StoreError> {
        let mut tx = self.begin("Appending highlight", room_id).await?;

        Self::upsert_room(&mut tx, room_id).await?;

        sqlx::query(
            r#"
            INSERT INTO room_highlights (room_id, seq, x, y, width, height)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(room_id)
        .bind(highlight.seq as i64)
        .bind(highlight.x)
        .bind(highlight.y)
        .bind(highlight.width)
        .bind(highlight.height)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_note(&self, room_id: &str, note: &Note) -> Result<(), StoreError> {
        let mut tx = self.begin("Appending note", room_id).await?;

        Self::upsert_room(&mut tx, room_id).await?;

        sqlx::query(
            r#"
            INSERT INTO room_notes (room_id, seq, x, y, text, author)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(room_id)
        .bind(note.seq as i64)
        .bind(note.x)
        .bind(note.y)
        .bind(&note.text)
        .bind(&note.author)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl UserStore for DbStore {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let result = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(SqlxError::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict(format!("username '{}' is taken", username)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
