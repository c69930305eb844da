use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "courier.toml",
    "config/courier.toml",
    "crates/config/courier.toml",
    "../courier.toml",
    "../config/courier.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub blobs: BlobConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://courier.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Tuning for the in-process push fan-out.
///
/// ```
/// use courier_config::PresenceConfig;
///
/// assert_eq!(PresenceConfig::default().channel_capacity, 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Events buffered per connection before further pushes are dropped.
    #[serde(default = "PresenceConfig::default_channel_capacity")]
    pub channel_capacity: usize,
}

impl PresenceConfig {
    const fn default_channel_capacity() -> usize {
        64
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: Self::default_channel_capacity(),
        }
    }
}

/// Where uploaded files end up and how they are addressed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    #[serde(default = "BlobConfig::default_root_dir")]
    pub root_dir: String,
    #[serde(default = "BlobConfig::default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "BlobConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl BlobConfig {
    fn default_root_dir() -> String {
        "data/blobs".to_string()
    }

    fn default_public_base_url() -> String {
        "http://127.0.0.1:7070/blobs".to_string()
    }

    const fn default_max_upload_bytes() -> usize {
        10 * 1024 * 1024
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root_dir: Self::default_root_dir(),
            public_base_url: Self::default_public_base_url(),
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use courier_config::load;
///
/// std::env::remove_var("COURIER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "presence.channel_capacity",
            i64::try_from(defaults.presence.channel_capacity).unwrap_or(i64::MAX),
        )?
        .set_default("blobs.root_dir", defaults.blobs.root_dir.clone())?
        .set_default(
            "blobs.public_base_url",
            defaults.blobs.public_base_url.clone(),
        )?
        .set_default(
            "blobs.max_upload_bytes",
            i64::try_from(defaults.blobs.max_upload_bytes).unwrap_or(i64::MAX),
        )?;

    let environment_overrides = config::Environment::with_prefix("COURIER").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COURIER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COURIER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.presence.channel_capacity == 0 {
        config.presence.channel_capacity = 1;
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
