//! Repository implementations over the SQLite pool

pub mod message_repository;
pub mod room_repository;

pub use message_repository::MessageRepository;
pub use room_repository::RoomRepository;
