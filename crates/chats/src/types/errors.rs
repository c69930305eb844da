//! Error types for the chat system.

use courier_database::StoreError;
use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Room not found: {id}")]
    RoomNotFound { id: String },

    #[error("Message not found: {id}")]
    MessageNotFound { id: String },

    #[error("Access denied: {reason}")]
    Authorization { reason: String },

    /// Lost a room-creation race. Only ever seen inside the room registry.
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn room_not_found(id: impl Into<String>) -> Self {
        Self::RoomNotFound { id: id.into() }
    }

    pub fn message_not_found(id: impl Into<String>) -> Self {
        Self::MessageNotFound { id: id.into() }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoomNotFound { .. } | Self::MessageNotFound { .. })
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(id) => Self::room_not_found(id),
            StoreError::MessageNotFound(id) => Self::message_not_found(id),
            StoreError::NotAMember { room_id, identity } => {
                Self::authorization(format!("{identity} is not a member of room {room_id}"))
            }
            StoreError::DuplicateRoom(pair) => Self::conflict(format!("room exists for {pair}")),
            StoreError::Corrupt(message) => Self::storage(message),
            StoreError::Database(error) => Self::storage(error.to_string()),
        }
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("I/O error: {err}"))
    }
}
