//! Shared types for the chat system.

pub mod errors;
pub mod events;
pub mod requests;
pub mod responses;

pub use errors::{ChatError, ChatResult};
pub use events::PresenceEvent;
pub use requests::{
    HideScope, OutgoingContent, SendFirstMessageRequest, SendMessageRequest, TemporaryRoom,
};
pub use responses::{MessageDescriptor, RoomListing, SendOutcome};
