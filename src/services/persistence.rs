use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::db::{AnnotationStore, StoreError};
use crate::models::{Highlight, Note};

const DEAD_LETTER_TARGET: &str = "collab_viewer::dead_letter";

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before attempt n+1 is `backoff * n`
    pub backoff: Duration,
}

#[derive(Debug)]
enum Write {
    Highlight { room_id: String, highlight: Highlight },
    Note { room_id: String, note: Note },
}

impl Write {
    fn room_id(&self) -> &str {
        match self {
            Write::Highlight { room_id, .. } | Write::Note { room_id, .. } => room_id,
        }
    }

    fn seq(&self) -> u64 {
        match self {
            Write::Highlight { highlight, .. } => highlight.seq,
            Write::Note { note, .. } => note.seq,
        }
    }

    fn payload(&self) -> String {
        let value = match self {
            Write::Highlight { highlight, .. } => serde_json::to_string(highlight),
            Write::Note { note, .. } => serde_json::to_string(note),
        };
        value.unwrap_or_else(|e| format!("<unserializable: {}>", e))
    }

    async fn apply(&self, store: &dyn AnnotationStore) -> Result<(), StoreError> {
        match self {
            Write::Highlight { room_id, highlight } => store.append_highlight(room_id, highlight).await,
            Write::Note { room_id, note } => store.append_note(room_id, note).await,
        }
    }
}

#[derive(Debug)]
enum PersistJob {
    Write(Write),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct PersistCounters {
    persisted: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    pending: AtomicU64,
}

/// Point-in-time copy of the writer counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistStats {
    pub persisted: u64,
    pub retries: u64,
    pub failures: u64,
    pub pending: u64,
}

/// Handle to the background annotation writer.
///
/// Appends are queued and return immediately; the relay never waits on the
/// store. The writer applies them one at a time in queue order, retrying per
/// `RetryPolicy`. A write that exhausts its attempts is counted and written to
/// the dead-letter log, and the sender is never told.
#[derive(Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistJob>,
    counters: Arc<PersistCounters>,
}

impl PersistHandle {
    /// Spawn the writer task on the current runtime.
    pub fn spawn(store: Arc<dyn AnnotationStore>, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(PersistCounters::default());
        tokio::spawn(run_writer(store, policy, rx, counters.clone()));
        info!("Annotation writer started");
        Self { tx, counters }
    }

    pub fn append_highlight(&self, room_id: &str, highlight: Highlight) {
        self.enqueue(Write::Highlight { room_id: room_id.to_string(), highlight });
    }

    pub fn append_note(&self, room_id: &str, note: Note) {
        self.enqueue(Write::Note { room_id: room_id.to_string(), note });
    }

    fn enqueue(&self, write: Write) {
        self.counters.pending.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.tx.send(PersistJob::Write(write)) {
            self.counters.pending.fetch_sub(1, Ordering::Relaxed);
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            if let PersistJob::Write(write) = e.0 {
                dead_letter(&write, "annotation writer is not running", 0);
            }
        }
    }

    /// Wait until every write queued before this call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistJob::Flush(done_tx)).is_err() {
            warn!("Flush requested but the annotation writer is not running");
            return;
        }
        let _ = done_rx.await;
    }

    pub fn stats(&self) -> PersistStats {
        PersistStats {
            persisted: self.counters.persisted.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            pending: self.counters.pending.load(Ordering::Relaxed),
        }
    }
}

async fn run_writer(
    store: Arc<dyn AnnotationStore>,
    policy: RetryPolicy,
    mut rx: mpsc::UnboundedReceiver<PersistJob>,
    counters: Arc<PersistCounters>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            PersistJob::Write(write) => {
                write_with_retry(store.as_ref(), &policy, &counters, &write).await;
                counters.pending.fetch_sub(1, Ordering::Relaxed);
            }
            PersistJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("Annotation writer stopped");
}

async fn write_with_retry(store: &dyn AnnotationStore, policy: &RetryPolicy, counters: &PersistCounters, write: &Write) {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match write.apply(store).await {
            Ok(()) => {
                counters.persisted.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    "Write of event {} in room {} failed (attempt {}/{}): {}",
                    write.seq(),
                    write.room_id(),
                    attempt,
                    max_attempts,
                    e
                );
                counters.retries.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                dead_letter(write, &e.to_string(), attempt);
                return;
            }
        }
    }
}

fn dead_letter(write: &Write, reason: &str, attempts: u32) {
    error!(
        target: DEAD_LETTER_TARGET,
        room_id = write.room_id(),
        seq = write.seq(),
        attempts,
        payload = %write.payload(),
        "Dropped annotation: {}",
        reason
    );
}
