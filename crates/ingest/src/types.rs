//! Event and record types shared across the pipeline.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Server part of a WhatsApp group JID.
const GROUP_SERVER: &str = "g.us";

/// Reserved sentinel chat for status broadcasts ("stories"); never a real
/// conversation.
const STATUS_BROADCAST: (&str, &str) = ("status", "broadcast");

/// A WhatsApp JID split into its user-facing component and server part.
///
/// Parsing is total: a bare string without `@` becomes `user` with an empty
/// `server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Jid {
    pub user: String,
    pub server: String,
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    /// Whether this JID denotes a group conversation.
    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }

    /// Whether this JID is the reserved status-broadcast sentinel.
    pub fn is_status_broadcast(&self) -> bool {
        (self.user.as_str(), self.server.as_str()) == STATUS_BROADCAST
    }
}

impl From<String> for Jid {
    fn from(raw: String) -> Self {
        match raw.split_once('@') {
            Some((user, server)) => Self::new(user, server),
            None => Self::new(raw, ""),
        }
    }
}

impl From<&str> for Jid {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}

impl std::fmt::Display for Jid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.server.is_empty() {
            write!(f, "{}", self.user)
        } else {
            write!(f, "{}@{}", self.user, self.server)
        }
    }
}

/// Content union of an inbound message. Exactly one variant per event; the
/// wire form is tagged so conflicting caption fields cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain conversation text.
    Text { text: String },
    /// Extended text (links, quotes, formatting).
    ExtendedText { text: String },
    Image {
        #[serde(default)]
        caption: String,
    },
    Video {
        #[serde(default)]
        caption: String,
    },
    Audio,
    Other,
}

/// An inbound message event as handed over by the messaging session.
///
/// Read-only to the pipeline; created fresh per event and discarded after the
/// synchronous processing of that event.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Platform-assigned unique event ID.
    pub id: String,
    /// Conversation identity (individual or group).
    pub chat: Jid,
    /// Author identity within the chat.
    pub sender: Jid,
    /// True if the local session authored the message.
    pub is_from_me: bool,
    /// Sender's self-declared public name, possibly empty.
    pub push_name: String,
    pub timestamp: DateTime<Utc>,
    /// `None` for protocol-level or reaction-only events carrying no content.
    pub content: Option<MessageContent>,
}

/// Coarse content-type tag of a normalized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    ExtendedText,
    Image,
    Video,
    Audio,
    Unknown,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Text => "text",
            Self::ExtendedText => "extended_text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Unknown => "unknown",
        };
        write!(f, "{tag}")
    }
}

/// The single stable record shape crossing the system boundary. Immutable
/// once constructed; produced, serialized, and discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    pub id: String,
    /// User-facing component of the chat JID, never the full identity.
    pub chat_jid: String,
    /// User-facing component of the sender JID.
    pub sender_jid: String,
    /// Resolved display name; never empty.
    pub sender: String,
    /// Extracted text or caption, possibly empty.
    pub content: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub is_from_me: bool,
    pub message_type: MessageType,
}
