//! Events emitted by the messaging client.
//!
//! [`ClientEvent`] is the payload delivered by the event source. Message
//! events carry an [`IncomingMessage`]; the conversation it belongs to is
//! looked up on demand through a [`ChatDirectory`].

use async_trait::async_trait;
use herald_core::{BoxError, Event};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a [`ClientEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The client finished connecting.
    Ready,
    /// The client lost its session.
    Disconnected,
    /// A pairing code must be scanned.
    Qr,
    /// A message was created in any conversation.
    MessageCreate,
}

impl EventKind {
    /// Every kind, in registration order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Ready,
        EventKind::Disconnected,
        EventKind::Qr,
        EventKind::MessageCreate,
    ];

    /// The client's wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Disconnected => "disconnected",
            EventKind::Qr => "qr",
            EventKind::MessageCreate => "message_create",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as delivered by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    /// Message id.
    pub id: String,
    /// Conversation the message belongs to.
    pub chat_id: String,
    /// Sender id.
    pub from: String,
    /// Recipient id.
    pub to: String,
    /// Group participant who wrote the message, if any.
    #[serde(default)]
    pub author: Option<String>,
    /// Text content.
    pub body: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Client message type, e.g. `chat` or `image`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Sent by the connected account.
    #[serde(default)]
    pub from_me: bool,
    /// Carries an attachment.
    #[serde(default)]
    pub has_media: bool,
}

/// An event emitted by the messaging client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The client is ready.
    Ready,
    /// The client disconnected.
    Disconnected {
        /// Reason reported by the client.
        reason: String,
    },
    /// A pairing code is available.
    Qr {
        /// The code to render.
        code: String,
    },
    /// A message was created.
    MessageCreate(IncomingMessage),
}

impl ClientEvent {
    /// The message payload, for message events.
    pub fn message(&self) -> Option<&IncomingMessage> {
        match self {
            ClientEvent::MessageCreate(msg) => Some(msg),
            _ => None,
        }
    }
}

impl Event for ClientEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Ready => EventKind::Ready,
            ClientEvent::Disconnected { .. } => EventKind::Disconnected,
            ClientEvent::Qr { .. } => EventKind::Qr,
            ClientEvent::MessageCreate(_) => EventKind::MessageCreate,
        }
    }
}

/// Metadata of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInfo {
    /// Conversation id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the conversation is a group.
    pub is_group: bool,
}

/// Looks up conversation metadata.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Fetches the conversation with `chat_id`.
    async fn chat(&self, chat_id: &str) -> Result<ChatInfo, BoxError>;
}

/// Returned when a non-message event reaches the message transform.
#[derive(Debug, thiserror::Error)]
#[error("expected a message event, got {0}")]
pub struct NotAMessage(EventKind);

/// The persisted view of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    /// Message id.
    pub id: String,
    /// Conversation id.
    pub chat_id: String,
    /// Sender id.
    pub from: String,
    /// Recipient id.
    pub to: String,
    /// Group participant who wrote the message, if any.
    pub author: Option<String>,
    /// Text content.
    pub body: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Client message type.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Sent by the connected account.
    pub from_me: bool,
    /// Carries an attachment.
    pub has_media: bool,
}

impl MessageData {
    /// Shapes a message event into its persisted view.
    pub fn from_event(event: ClientEvent) -> Result<Self, BoxError> {
        match event {
            ClientEvent::MessageCreate(msg) => Ok(msg.into()),
            other => Err(Box::new(NotAMessage(other.kind()))),
        }
    }
}

impl From<IncomingMessage> for MessageData {
    fn from(msg: IncomingMessage) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            from: msg.from,
            to: msg.to,
            author: msg.author,
            body: msg.body,
            timestamp: msg.timestamp,
            message_type: msg.message_type,
            from_me: msg.from_me,
            has_media: msg.has_media,
        }
    }
}
