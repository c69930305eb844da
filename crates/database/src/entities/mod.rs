//! Persisted shapes for rooms and their partitioned message logs

pub mod message;
pub mod room;

pub use message::{
    FileRef, MediaKind, MessageBody, MessageFlags, MessageVariant, Partition, RoomPartitions,
    StoredMessage,
};
pub use room::{LastMessage, NewRoom, PairKey, Room, RoomMember};
