use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

pub type ConnId = uuid::Uuid;

/// Outbound half of a live connection; frames are serialized JSON text.
pub type OutboundTx = mpsc::UnboundedSender<String>;

#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub id: ConnId,
    pub tx: OutboundTx,
    /// Room the connection is bound to. At most one; the last join wins.
    pub room: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl ConnCtx {
    pub fn new(tx: OutboundTx) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            tx,
            room: None,
            connected_at: Utc::now(),
        }
    }

    /// Queue a frame for the socket writer. False once the connection is gone.
    pub fn push(&self, frame: String) -> bool {
        self.tx.send(frame).is_ok()
    }
}
