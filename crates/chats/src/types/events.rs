//! Push events delivered over the presence channel.

use serde::{Deserialize, Serialize};

use super::responses::MessageDescriptor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PresenceEvent {
    /// Something new landed in a room the recipient belongs to.
    NewMessageReceived {
        room_id: String,
        sender_identity: String,
        message: MessageDescriptor,
        /// All messages from the same send when it carried more than one.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        messages: Vec<MessageDescriptor>,
    },
}

impl PresenceEvent {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            PresenceEvent::NewMessageReceived { .. } => "newMessageReceived",
        }
    }

    pub fn room_id(&self) -> &str {
        match self {
            PresenceEvent::NewMessageReceived { room_id, .. } => room_id,
        }
    }
}
