use std::sync::Arc;

use anyhow::{Context, Result};
use courier_chats::{BlobStore, ChatGateway, LocalBlobStore, MessageStore, PresenceChannel};
use courier_config::AppConfig;
use courier_database::initialize_database;
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Long-lived services shared by the HTTP server and the operator commands.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub store: MessageStore,
    pub presence: PresenceChannel,
    pub chats: ChatGateway,
    pub blobs: Arc<dyn BlobStore>,
    pub max_upload_bytes: usize,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let store = MessageStore::new(db_pool.clone());
        let presence = PresenceChannel::new(config.presence.channel_capacity);
        let chats = ChatGateway::new(store.clone(), presence.clone());
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            &config.blobs.root_dir,
            config.blobs.public_base_url.clone(),
        ));

        info!(
            blob_root = %config.blobs.root_dir,
            channel_capacity = config.presence.channel_capacity,
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            store,
            presence,
            chats,
            blobs,
            max_upload_bytes: config.blobs.max_upload_bytes,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
