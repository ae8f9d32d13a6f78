use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::models::SendMessage;
use super::connctx::{ConnCtx, ConnId, OutboundTx};

#[derive(Debug, Default)]
struct MuxState {
    conns: HashMap<ConnId, ConnCtx>,
    /// Members of each room with at least one bound connection
    rooms: HashMap<String, HashSet<ConnId>>,
    /// Last sequence number issued per room. Outlives membership so numbers
    /// never repeat when a room empties and fills again.
    last_seq: HashMap<String, u64>,
}

/// Outcome of a fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Broadcast {
    pub seq: u64,
    pub delivered: usize,
}

/// Tracks which live connection belongs to which room and fans events out.
///
/// Sequence numbers are issued and frames queued under one lock, so every
/// recipient in a room sees the room's events in the same order.
#[derive(Debug, Default)]
pub struct Multiplexer {
    state: Mutex<MuxState>,
}

fn encode(msg: &SendMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to serialize outbound message {:?}: {}", msg, e);
            None
        }
    }
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new live connection, not yet bound to any room.
    pub async fn connect(&self, tx: OutboundTx) -> ConnId {
        let ctx = ConnCtx::new(tx);
        let id = ctx.id;
        self.state.lock().await.conns.insert(id, ctx);
        debug!("Connection {} registered", id);
        id
    }

    /// Bind `conn` to `room_id`, replacing any previous binding.
    /// Returns the room the connection was bound to before.
    pub async fn join(&self, conn: ConnId, room_id: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        let MuxState { conns, rooms, .. } = &mut *state;

        let Some(ctx) = conns.get_mut(&conn) else {
            error!("Join for unknown connection {}", conn);
            return None;
        };

        let previous = ctx.room.replace(room_id.to_string());
        if let Some(prev) = previous.as_deref() {
            if prev != room_id {
                leave_room(rooms, prev, conn);
            }
        }
        rooms.entry(room_id.to_string()).or_default().insert(conn);
        info!("Connection {} joined room {}", conn, room_id);
        previous
    }

    pub async fn room_of(&self, conn: ConnId) -> Option<String> {
        self.state.lock().await.conns.get(&conn).and_then(|c| c.room.clone())
    }

    /// Unicast. False if the connection is unknown or already closed.
    pub async fn send_to(&self, conn: ConnId, msg: &SendMessage) -> bool {
        let Some(frame) = encode(msg) else { return false };
        let state = self.state.lock().await;
        match state.conns.get(&conn) {
            Some(ctx) => ctx.push(frame),
            None => false,
        }
    }

    /// Deliver to every connection bound to `room_id` except `sender`.
    /// `build` receives the room sequence number assigned to this event.
    pub async fn broadcast_to_others<F>(&self, room_id: &str, sender: ConnId, build: F) -> Broadcast
    where
        F: FnOnce(u64) -> SendMessage,
    {
        let mut state = self.state.lock().await;
        let MuxState { conns, rooms, last_seq } = &mut *state;

        let counter = last_seq.entry(room_id.to_string()).or_insert(0);
        *counter += 1;
        let seq = *counter;

        let Some(frame) = encode(&build(seq)) else {
            return Broadcast { seq, delivered: 0 };
        };

        let mut delivered = 0;
        if let Some(members) = rooms.get(room_id) {
            for member in members.iter().filter(|m| **m != sender) {
                if let Some(ctx) = conns.get(member) {
                    if ctx.push(frame.clone()) {
                        delivered += 1;
                    }
                }
            }
        }
        debug!("Event {} in room {} delivered to {} connection(s)", seq, room_id, delivered);

        Broadcast { seq, delivered }
    }

    /// Make sure the next sequence number issued for `room_id` is above `seq`.
    pub async fn advance_seq(&self, room_id: &str, seq: u64) {
        let mut state = self.state.lock().await;
        let counter = state.last_seq.entry(room_id.to_string()).or_insert(0);
        *counter = (*counter).max(seq);
    }

    /// Drop the connection and its room binding. Peers are not notified.
    pub async fn disconnect(&self, conn: ConnId) -> Option<String> {
        let mut state = self.state.lock().await;
        let MuxState { conns, rooms, .. } = &mut *state;

        let ctx = conns.remove(&conn)?;
        if let Some(room_id) = ctx.room.as_deref() {
            leave_room(rooms, room_id, conn);
        }
        let lasted = Utc::now().signed_duration_since(ctx.connected_at);
        info!("Connection {} removed after {}s", conn, lasted.num_seconds());
        ctx.room
    }

    /// Number of live connections and of rooms with at least one member
    pub async fn stats(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.conns.len(), state.rooms.len())
    }
}

fn leave_room(rooms: &mut HashMap<String, HashSet<ConnId>>, room_id: &str, conn: ConnId) {
    if let Some(members) = rooms.get_mut(room_id) {
        members.remove(&conn);
        if members.is_empty() {
            rooms.remove(room_id);
        }
    }
}
