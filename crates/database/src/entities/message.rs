//! Message entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::room::Room;

/// Which sub-sequence of a partition a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVariant {
    Text,
    File,
}

impl MessageVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageVariant::Text => "text",
            MessageVariant::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(MessageVariant::Text),
            "file" => Some(MessageVariant::File),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Classify a MIME type such as `image/png`. Anything unrecognised is a document.
    pub fn from_mime(mime: &str) -> Self {
        let top_level = mime
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match top_level.as_str() {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            _ => MediaKind::Document,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }
}

impl From<&str> for MediaKind {
    fn from(s: &str) -> Self {
        match s {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            _ => MediaKind::Document,
        }
    }
}

/// Reference to bytes held by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    pub url: String,
    pub media_kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum MessageBody {
    Text { content: String },
    File(FileRef),
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> Self {
        MessageBody::Text {
            content: content.into(),
        }
    }

    pub fn variant(&self) -> MessageVariant {
        match self {
            MessageBody::Text { .. } => MessageVariant::Text,
            MessageBody::File(_) => MessageVariant::File,
        }
    }

    /// Short human-readable form used for room listings.
    pub fn summary(&self) -> &str {
        match self {
            MessageBody::Text { content } => content,
            MessageBody::File(file) => &file.name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFlags {
    pub hidden_for_sender: bool,
    pub hidden_for_everyone: bool,
}

/// A message as persisted in its sender's partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub public_id: String,
    pub room_id: i64,
    pub sender_identity: String,
    pub body: MessageBody,
    /// 1-based index inside the (sender, variant) partition.
    pub position: i64,
    /// Room-wide append counter.
    pub seq: i64,
    pub sent_at: DateTime<Utc>,
    pub flags: MessageFlags,
}

impl StoredMessage {
    pub fn variant(&self) -> MessageVariant {
        self.body.variant()
    }
}

/// One member's outgoing log, split by variant. Both vectors are in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub sender_identity: String,
    pub text: Vec<StoredMessage>,
    pub files: Vec<StoredMessage>,
}

impl Partition {
    pub fn empty(sender_identity: impl Into<String>) -> Self {
        Self {
            sender_identity: sender_identity.into(),
            text: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A room together with every member's partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomPartitions {
    pub room: Room,
    pub partitions: Vec<Partition>,
}
