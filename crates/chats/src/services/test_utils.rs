//! Test utilities for service layer testing

use courier_config::DatabaseConfig;
use courier_database::initialize_database;
use tempfile::TempDir;

use super::{ChatGateway, MessageStore, PresenceChannel};

/// A migrated file-backed database in a fresh temp dir, wrapped in a store.
pub async fn create_test_store() -> (MessageStore, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
        max_connections: 4,
    };

    let pool = initialize_database(&config)
        .await
        .expect("Failed to create test database");

    (MessageStore::new(pool), temp_dir)
}

pub async fn create_test_gateway() -> (ChatGateway, TempDir) {
    let (store, temp_dir) = create_test_store().await;
    (ChatGateway::new(store, PresenceChannel::new(16)), temp_dir)
}
