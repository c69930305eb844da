//! Outbound shapes returned by the chat gateway.

use chrono::{DateTime, Utc};
use courier_database::{
    FileRef, LastMessage, MessageBody, MessageVariant, RoomMember, StoredMessage,
};
use serde::{Deserialize, Serialize};

/// A message as callers see it, tagged with who sent it and which variant it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDescriptor {
    pub id: String,
    pub sender_identity: String,
    pub sender_name: String,
    pub variant: MessageVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ref: Option<FileRef>,
    pub timestamp: DateTime<Utc>,
    pub seq: i64,
    pub hidden_for_sender: bool,
    pub hidden_for_everyone: bool,
}

impl MessageDescriptor {
    pub fn from_stored(message: &StoredMessage, sender_name: &str) -> Self {
        let (text, file_ref) = match &message.body {
            MessageBody::Text { content } => (Some(content.clone()), None),
            MessageBody::File(file) => (None, Some(file.clone())),
        };

        Self {
            id: message.public_id.clone(),
            sender_identity: message.sender_identity.clone(),
            sender_name: sender_name.to_string(),
            variant: message.variant(),
            text,
            file_ref,
            timestamp: message.sent_at,
            seq: message.seq,
            hidden_for_sender: message.flags.hidden_for_sender,
            hidden_for_everyone: message.flags.hidden_for_everyone,
        }
    }

    /// Whether `viewer` should see this entry.
    pub fn visible_to(&self, viewer: &str) -> bool {
        !(self.hidden_for_everyone || (self.hidden_for_sender && self.sender_identity == viewer))
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub room_id: String,
    /// `true` when this send created the room.
    pub created: bool,
    /// Every appended message in append order; one unless text and file were both sent.
    pub messages: Vec<MessageDescriptor>,
}

impl SendOutcome {
    /// The last appended message.
    pub fn message(&self) -> Option<&MessageDescriptor> {
        self.messages.last()
    }
}

/// One row of an identity's room list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub room_id: String,
    pub other_member: RoomMember,
    pub last_message: Option<LastMessage>,
    pub updated_at: DateTime<Utc>,
}
