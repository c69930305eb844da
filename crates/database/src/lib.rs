//! Courier Database Crate
//!
//! Connection management, embedded migrations and the SQLite repositories backing
//! two-party rooms and their per-sender partitioned message logs.

use courier_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use entities::{
    FileRef, LastMessage, MediaKind, MessageBody, MessageFlags, MessageVariant, NewRoom,
    PairKey, Partition, Room, RoomMember, RoomPartitions, StoredMessage,
};
pub use repos::{MessageRepository, RoomRepository};
pub use types::{DatabaseError, DatabaseResult, StoreError, StoreResult};

/// Open the pool and apply migrations.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}
