use serde::{Deserialize, Serialize};
use crate::models::{Highlight, Note};

// Inbound

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub room_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUploadedMessage {
    pub room_id: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PageChangeMessage {
    pub room_id: String,
    pub page: u32,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HighlightMessage {
    pub room_id: String,
    pub highlight: Highlight,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NoteMessage {
    pub room_id: String,
    pub note: Note,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_id: String,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
    pub room_id: String,
    pub position: Position,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PingMessage {
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "documentUploaded")]
    DocumentUploaded(DocumentUploadedMessage),
    #[serde(rename = "pageChanged")]
    PageChanged(PageChangeMessage),
    #[serde(rename = "highlightAdded")]
    HighlightAdded(HighlightMessage),
    #[serde(rename = "noteAdded")]
    NoteAdded(NoteMessage),
    #[serde(rename = "chatMessage")]
    Chat(ChatMessage),
    #[serde(rename = "cursorMoved")]
    CursorMoved(CursorMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

impl ReceivedMessage {
    /// Room named in the payload, if the event is room scoped
    pub fn room_id(&self) -> Option<&str> {
        match self {
            ReceivedMessage::Join(m) => Some(&m.room_id),
            ReceivedMessage::DocumentUploaded(m) => Some(&m.room_id),
            ReceivedMessage::PageChanged(m) => Some(&m.room_id),
            ReceivedMessage::HighlightAdded(m) => Some(&m.room_id),
            ReceivedMessage::NoteAdded(m) => Some(&m.room_id),
            ReceivedMessage::Chat(m) => Some(&m.room_id),
            ReceivedMessage::CursorMoved(m) => Some(&m.room_id),
            ReceivedMessage::Ping(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReceivedMessage::Join(_) => "join",
            ReceivedMessage::DocumentUploaded(_) => "documentUploaded",
            ReceivedMessage::PageChanged(_) => "pageChanged",
            ReceivedMessage::HighlightAdded(_) => "highlightAdded",
            ReceivedMessage::NoteAdded(_) => "noteAdded",
            ReceivedMessage::Chat(_) => "chatMessage",
            ReceivedMessage::CursorMoved(_) => "cursorMoved",
            ReceivedMessage::Ping(_) => "ping",
        }
    }
}

// Outbound

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAvailableMessage {
    pub url: String,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageChangedMessage {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitialDataMessage {
    pub room_id: String,
    pub highlights: Vec<Highlight>,
    pub notes: Vec<Note>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HighlightAddedMessage {
    pub highlight: Highlight,
    pub seq: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteAddedMessage {
    pub note: Note,
    pub seq: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcastMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub sent_at: String,
    pub connection_id: String,
    pub seq: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorBroadcastMessage {
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub connection_id: String,
    pub seq: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "documentAvailable")]
    DocumentAvailable(DocumentAvailableMessage),
    #[serde(rename = "pageChanged")]
    PageChanged(PageChangedMessage),
    #[serde(rename = "initialData")]
    InitialData(InitialDataMessage),
    #[serde(rename = "highlightAdded")]
    HighlightAdded(HighlightAddedMessage),
    #[serde(rename = "noteAdded")]
    NoteAdded(NoteAddedMessage),
    #[serde(rename = "chatMessage")]
    Chat(ChatBroadcastMessage),
    #[serde(rename = "cursorMoved")]
    CursorMoved(CursorBroadcastMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}
