//! For reading application configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Image upload configuration.
    pub upload: UploadConfig,
    /// Marketplace rules.
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Server address.
    pub address: String,
    /// Server http port.
    pub port: u16,
    /// How long a request may run before it is cancelled.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    /// The database username.
    pub username: String,
    /// The database password.
    pub password: String,
    /// The database port.
    pub port: u16,
    /// The database name.
    pub database_name: String,
    /// The database host.
    pub host: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    100
}

/// Where uploaded item images live.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadConfig {
    /// Directory that receives uploaded images.
    pub directory: PathBuf,
    /// Directory holding `thumb_<file>` thumbnails.
    pub thumbnail_directory: PathBuf,
    /// URL prefix stored in image paths, e.g. `/uploads`.
    pub public_prefix: String,
    /// Largest accepted multipart body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

/// Marketplace rules.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct MarketplaceConfig {
    /// Reject item status changes outside the allowed transition table.
    #[serde(default)]
    pub strict_status_transitions: bool,
}

/// Retrieve [`Config`] from the default configuration file.
#[tracing::instrument]
pub fn load_config() -> color_eyre::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("config"))
        .add_source(environment())
        .build()?
        .try_deserialize()?;
    Ok(config)
}

/// Overrides such as `APP__DATABASE__HOST` for `database.host`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("app").separator("__")
}
