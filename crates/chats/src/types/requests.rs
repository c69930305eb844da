//! Inbound request shapes.

use courier_database::{FileRef, MessageBody, RoomMember};
use serde::{Deserialize, Serialize};

/// What a send carries. At least one of the two must be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<FileRef>,
}

impl OutgoingContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            file: None,
        }
    }

    pub fn file(file: FileRef) -> Self {
        Self {
            text: None,
            file: Some(file),
        }
    }

    /// Bodies in append order: the file goes first so a caption lands after it.
    pub fn into_bodies(self) -> Vec<MessageBody> {
        let mut bodies = Vec::with_capacity(2);
        if let Some(file) = self.file {
            bodies.push(MessageBody::File(file));
        }
        if let Some(content) = self.text {
            bodies.push(MessageBody::Text { content });
        }
        bodies
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFirstMessageRequest {
    pub sender_identity: String,
    pub sender_name: String,
    pub receiver_identity: String,
    pub receiver_name: String,
    #[serde(flatten)]
    pub content: OutgoingContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_identity: String,
    pub sender_name: String,
    #[serde(flatten)]
    pub content: OutgoingContent,
}

/// Who a hidden message disappears for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HideScope {
    #[serde(rename = "self")]
    OnlyMe,
    Everyone,
}

/// A conversation the local user has opened but not yet sent anything in.
///
/// Nothing about it is persisted. Sending the first message turns it into a real room:
///
/// ```
/// use courier_chats::{OutgoingContent, TemporaryRoom};
/// use courier_database::RoomMember;
///
/// let draft = TemporaryRoom::new(RoomMember::new("alice", "Alice"), RoomMember::new("bob", "Bob"));
/// let request = draft.into_first_message(OutgoingContent::text("hi"));
/// assert_eq!(request.receiver_identity, "bob");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryRoom {
    pub me: RoomMember,
    pub other: RoomMember,
}

impl TemporaryRoom {
    pub fn new(me: RoomMember, other: RoomMember) -> Self {
        Self { me, other }
    }

    pub fn into_first_message(self, content: OutgoingContent) -> SendFirstMessageRequest {
        SendFirstMessageRequest {
            sender_identity: self.me.identity,
            sender_name: self.me.display_name,
            receiver_identity: self.other.identity,
            receiver_name: self.other.display_name,
            content,
        }
    }
}
