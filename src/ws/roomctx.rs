use moka::sync::Cache;
use std::time::Duration;
use tracing::{debug, info};

/// Ephemeral view state of a room: which document is open and on which page.
///
/// Lives only in this process. It is a latency shortcut for hydrating late
/// joiners, not a source of truth.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomCtx {
    pub document_url: Option<String>,
    pub page: u32,
    /// Bumped on every document change so clients can drop stale announcements
    pub document_version: u64,
}

/// Process-wide room state cache, owned by `AppState`
pub struct RoomStateCache {
    cache: Cache<String, RoomCtx>,
}

impl RoomStateCache {
    /// `time_to_idle` of `None` keeps entries for the process lifetime, bounded
    /// only by `max_capacity`.
    pub fn new(max_capacity: u64, time_to_idle: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if let Some(tti) = time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        info!("Room state cache initialized (capacity {}, idle expiry {:?})", max_capacity, time_to_idle);
        Self { cache: builder.build() }
    }

    pub fn get(&self, room_id: &str) -> Option<RoomCtx> {
        self.cache.get(room_id)
    }

    /// Open a new document in the room. Navigation resets to page 1.
    pub fn set_document(&self, room_id: &str, url: &str) -> RoomCtx {
        let entry = self.cache.entry(room_id.to_string()).and_upsert_with(|existing| {
            let version = existing.map(|e| e.into_value().document_version).unwrap_or(0) + 1;
            RoomCtx {
                document_url: Some(url.to_string()),
                page: 1,
                document_version: version,
            }
        });
        debug!("Room {} now shows {}", room_id, url);
        entry.into_value()
    }

    /// Move the room to `page`, creating an entry without a document if needed.
    pub fn set_page(&self, room_id: &str, page: u32) -> RoomCtx {
        self.cache
            .entry(room_id.to_string())
            .and_upsert_with(|existing| match existing {
                Some(entry) => RoomCtx { page, ..entry.into_value() },
                None => RoomCtx {
                    document_url: None,
                    page,
                    document_version: 0,
                },
            })
            .into_value()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> RoomStateCache {
        RoomStateCache::new(1_000, None)
    }

    #[test]
    fn unknown_room_is_absent() {
        assert!(cache().get("nope").is_none());
    }

    #[test]
    fn set_document_resets_page_and_bumps_version() {
        let rooms = cache();
        rooms.set_document("r1", "http://x/a.pdf");
        rooms.set_page("r1", 7);

        let ctx = rooms.set_document("r1", "http://x/b.pdf");
        assert_eq!(ctx.page, 1);
        assert_eq!(ctx.document_version, 2);
        assert_eq!(rooms.get("r1").unwrap().document_url.as_deref(), Some("http://x/b.pdf"));
    }

    #[test]
    fn set_page_without_document_creates_partial_entry() {
        let rooms = cache();
        let ctx = rooms.set_page("r2", 4);
        assert_eq!(ctx, RoomCtx { document_url: None, page: 4, document_version: 0 });
    }

    #[test]
    fn set_page_keeps_document() {
        let rooms = cache();
        rooms.set_document("r1", "http://x/doc.pdf");
        let ctx = rooms.set_page("r1", 3);
        assert_eq!(ctx.document_url.as_deref(), Some("http://x/doc.pdf"));
        assert_eq!(ctx.document_version, 1);
        assert_eq!(ctx.page, 3);
    }

    #[test]
    fn rooms_are_isolated() {
        let rooms = cache();
        rooms.set_document("a", "http://x/a.pdf");
        rooms.set_page("b", 9);
        assert_eq!(rooms.get("a").unwrap().page, 1);
        assert!(rooms.get("b").unwrap().document_url.is_none());
        assert_eq!(rooms.entry_count(), 2);
    }
}
