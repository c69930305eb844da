//! Room entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::MessageVariant;

/// One side of a two-party room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub identity: String,
    pub display_name: String,
}

impl RoomMember {
    pub fn new(identity: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
        }
    }
}

/// Order-independent key for a member pair; `{a, b}` and `{b, a}` produce the same key.
///
/// The lower identity is length-prefixed so identities containing the separator
/// cannot collide with a different pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey(String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}:{}|{}", low.len(), low, high))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Denormalized summary of the most recent message, kept on the room row for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub sender_identity: String,
    pub variant: MessageVariant,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub public_id: String,
    pub pair_key: PairKey,
    pub members: [RoomMember; 2],
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_member(&self, identity: &str) -> bool {
        self.member(identity).is_some()
    }

    pub fn member(&self, identity: &str) -> Option<&RoomMember> {
        self.members.iter().find(|member| member.identity == identity)
    }

    /// The counterpart of `identity`, or `None` when `identity` is not in the room.
    pub fn other_member(&self, identity: &str) -> Option<&RoomMember> {
        match (&self.members[0], &self.members[1]) {
            (a, b) if a.identity == identity => Some(b),
            (a, b) if b.identity == identity => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub member_a: RoomMember,
    pub member_b: RoomMember,
}

impl NewRoom {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.member_a.identity, &self.member_b.identity)
    }
}
