//! Error types for the database layer

use thiserror::Error;

/// Failures while opening or migrating the database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// Failures surfaced by the room and message repositories
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("{identity} is not a member of room {room_id}")]
    NotAMember { room_id: String, identity: String },

    #[error("A room already exists for pair {0}")]
    DuplicateRoom(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}
