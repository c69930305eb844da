//! Chat services: storage, room registry, reconstruction, presence and the gateway façade.

pub mod blob_store;
pub mod chat_gateway;
pub mod message_store;
pub mod presence;
pub mod reconstructor;
pub mod room_registry;

#[cfg(test)]
pub(crate) mod test_utils;

pub use blob_store::{BlobStore, LocalBlobStore};
pub use chat_gateway::ChatGateway;
pub use message_store::MessageStore;
pub use presence::{ConnectionId, PresenceChannel, PresenceSubscription};
pub use reconstructor::MessageReconstructor;
pub use room_registry::RoomRegistry;
