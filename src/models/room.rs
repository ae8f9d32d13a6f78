use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_ROOM_ID_LEN: usize = 256;
pub const MAX_NOTE_TEXT_LEN: usize = 10_000;

/// A rectangular highlight drawn over a page.
///
/// `room_id` and `seq` are stamped by the server when the highlight is relayed;
/// whatever the client sends for them is overwritten.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub seq: u64,
}

impl Highlight {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("x", self.x), ("y", self.y), ("width", self.width), ("height", self.height)] {
            if !value.is_finite() {
                return Err(format!("highlight.{} must be a finite number", name));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err("highlight width and height must not be negative".to_string());
        }
        Ok(())
    }
}

/// A sticky note. `author` is free text supplied by the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub author: String,
    #[serde(default)]
    pub seq: u64,
}

impl Note {
    pub fn validate(&self) -> Result<(), String> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err("note coordinates must be finite numbers".to_string());
        }
        if self.text.len() > MAX_NOTE_TEXT_LEN {
            return Err(format!("note text exceeds {} bytes", MAX_NOTE_TEXT_LEN));
        }
        Ok(())
    }
}

/// Durable annotation record of a room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room_id: String,
    pub highlights: Vec<Highlight>,
    pub notes: Vec<Note>,
}

impl RoomRecord {
    pub fn empty(room_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            highlights: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Highest sequence number present in the record, 0 when empty
    pub fn max_seq(&self) -> u64 {
        let h = self.highlights.iter().map(|h| h.seq).max().unwrap_or(0);
        let n = self.notes.iter().map(|n| n.seq).max().unwrap_or(0);
        h.max(n)
    }
}

pub fn validate_room_id(room_id: &str) -> Result<(), String> {
    if room_id.trim().is_empty() {
        return Err("roomId must not be empty".to_string());
    }
    if room_id.len() > MAX_ROOM_ID_LEN {
        return Err(format!("roomId exceeds {} bytes", MAX_ROOM_ID_LEN));
    }
    Ok(())
}
