//! Durable, per-sender partitioned append log.
//!
//! Each member writes only their own partition, so the two participants of a room never
//! contend on the same rows. The price is a merge on read, done by the reconstructor.

use courier_database::{
    LastMessage, MessageBody, MessageFlags, MessageRepository, NewRoom, PairKey, Partition,
    Room, RoomMember, RoomPartitions, RoomRepository, StoredMessage,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::types::{ChatError, ChatResult, RoomListing};

#[derive(Clone)]
pub struct MessageStore {
    rooms: RoomRepository,
    messages: MessageRepository,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            rooms: RoomRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// Persist a new room. Fails with [`ChatError::Conflict`] if the pair already has one.
    pub async fn create_room(&self, member_a: RoomMember, member_b: RoomMember) -> ChatResult<Room> {
        let room = self.rooms.create(&NewRoom { member_a, member_b }).await?;
        Ok(room)
    }

    pub async fn find_room(&self, room_id: &str) -> ChatResult<Room> {
        self.rooms
            .find_by_public_id(room_id)
            .await?
            .ok_or_else(|| ChatError::room_not_found(room_id))
    }

    pub async fn find_room_by_pair(&self, pair_key: &PairKey) -> ChatResult<Option<Room>> {
        Ok(self.rooms.find_by_pair_key(pair_key).await?)
    }

    /// Append one message to the sender's text or file sub-sequence.
    pub async fn append(
        &self,
        room_id: &str,
        sender_identity: &str,
        body: MessageBody,
    ) -> ChatResult<StoredMessage> {
        Ok(self.messages.append(room_id, sender_identity, &body).await?)
    }

    /// Append several messages atomically, in order.
    pub async fn append_all(
        &self,
        room_id: &str,
        sender_identity: &str,
        bodies: &[MessageBody],
    ) -> ChatResult<Vec<StoredMessage>> {
        Ok(self
            .messages
            .append_all(room_id, sender_identity, bodies)
            .await?)
    }

    /// Every member's text and file sub-sequences, each in append order.
    pub async fn list_partitions(&self, room_id: &str) -> ChatResult<RoomPartitions> {
        let room = self.find_room(room_id).await?;
        let rows = self.messages.list_for_room(room.id).await?;

        let mut partitions: Vec<Partition> = room
            .members
            .iter()
            .map(|member| Partition::empty(member.identity.clone()))
            .collect();

        for message in rows {
            let Some(partition) = partitions
                .iter_mut()
                .find(|partition| partition.sender_identity == message.sender_identity)
            else {
                return Err(ChatError::storage(format!(
                    "message {} in room {} has non-member sender",
                    message.public_id, room.public_id
                )));
            };

            match message.body {
                MessageBody::Text { .. } => partition.text.push(message),
                MessageBody::File(_) => partition.files.push(message),
            }
        }

        Ok(RoomPartitions { room, partitions })
    }

    /// Overwrite the room's summary. An older summary never replaces a newer one.
    pub async fn update_last_message(&self, room_id: &str, summary: &LastMessage) -> ChatResult<()> {
        let applied = self.rooms.update_last_message(room_id, summary).await?;
        if !applied {
            debug!(room_id, "last message summary already newer");
        }
        Ok(())
    }

    /// Rooms where `identity` is a member, each seen from that member's side.
    pub async fn list_rooms_for(&self, identity: &str) -> ChatResult<Vec<RoomListing>> {
        let rooms = self.rooms.list_for_member(identity).await?;

        rooms
            .into_iter()
            .map(|room| {
                let other_member = room.other_member(identity).cloned().ok_or_else(|| {
                    ChatError::storage(format!("room {} listed for non-member", room.public_id))
                })?;
                Ok(RoomListing {
                    room_id: room.public_id,
                    other_member,
                    last_message: room.last_message,
                    updated_at: room.updated_at,
                })
            })
            .collect()
    }

    pub async fn find_message(&self, room: &Room, message_id: &str) -> ChatResult<StoredMessage> {
        self.messages
            .find_by_public_id(room.id, message_id)
            .await?
            .ok_or_else(|| ChatError::message_not_found(message_id))
    }

    /// Change status flags in place; ordering data is untouched.
    pub async fn set_message_flags(
        &self,
        message: &StoredMessage,
        flags: MessageFlags,
    ) -> ChatResult<()> {
        self.messages.set_flags(message.id, flags).await?;
        Ok(())
    }
}
