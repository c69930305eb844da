//! # Courier Chats Crate
//!
//! Two-party direct messaging: rooms that exist at most once per member pair, a
//! per-sender partitioned message log, a read-time merge into one timeline, and a
//! best-effort push channel for "something new arrived" notices.
//!
//! ## Architecture
//!
//! - **MessageStore**: durable partitioned append log (SQLite through `courier-database`)
//! - **RoomRegistry**: idempotent find-or-create for a member pair
//! - **MessageReconstructor**: k-way merge of partitions into a timeline
//! - **PresenceChannel**: per-identity connection registry for push events
//! - **ChatGateway**: validation and orchestration; the only type callers need
//! - **BlobStore**: where file bytes go before a file message references them
//!
//! ## Usage
//!
//! ```rust,no_run
//! use courier_chats::{ChatGateway, MessageStore, OutgoingContent, PresenceChannel, SendFirstMessageRequest};
//!
//! # async fn run(pool: sqlx::SqlitePool) -> courier_chats::ChatResult<()> {
//! let gateway = ChatGateway::new(MessageStore::new(pool), PresenceChannel::new(64));
//! let outcome = gateway
//!     .send_first_message(SendFirstMessageRequest {
//!         sender_identity: "alice".into(),
//!         sender_name: "Alice".into(),
//!         receiver_identity: "bob".into(),
//!         receiver_name: "Bob".into(),
//!         content: OutgoingContent::text("hi"),
//!     })
//!     .await?;
//! let history = gateway.list_messages(&outcome.room_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod services;
pub mod types;
pub mod utils;

pub use services::{
    BlobStore, ChatGateway, ConnectionId, LocalBlobStore, MessageReconstructor, MessageStore,
    PresenceChannel, PresenceSubscription, RoomRegistry,
};
pub use types::{
    ChatError, ChatResult, HideScope, MessageDescriptor, OutgoingContent, PresenceEvent,
    RoomListing, SendFirstMessageRequest, SendMessageRequest, SendOutcome, TemporaryRoom,
};
