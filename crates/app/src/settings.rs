//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml`, then overridden by `BOOKKEEPING__*` environment
//! variables (e.g. `BOOKKEEPING__SERVER__PORT=8080`).
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    server::DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    #[serde(default = "default_storage_root")]
    pub root: String,
    pub public_prefix: Option<String>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            public_prefix: None,
        }
    }
}

fn default_storage_root() -> String {
    engine::DEFAULT_UPLOADS_DIR.to_string()
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub storage: Storage,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::with_name("settings").required(false)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .add_source(Environment::with_prefix("BOOKKEEPING").separator("__"))
            .build()?
            .try_deserialize()
    }
}
