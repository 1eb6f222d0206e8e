use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Connection pool ceiling. Default: 10.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle. Default: 1.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connect and acquire timeout in seconds. Default: 8.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_sqlx_logging")]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout_secs() -> u64 {
    8
}
fn default_sqlx_logging() -> bool {
    true
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            sqlx_logging: default_sqlx_logging(),
        }
    }
}

/// Limits applied to uploaded hero images before they reach the service.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Maximum size of a single image in bytes. Default: 5 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    /// Maximum number of images per request. Default: 10.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Accepted image media types.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

fn default_max_file_size() -> usize {
    5 * 1024 * 1024
}
fn default_max_files() -> usize {
    10
}
fn default_allowed_mime_types() -> Vec<String> {
    vec!["image/jpeg".into(), "image/jpg".into(), "image/png".into()]
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

impl UploadConfig {
    /// Request body ceiling for routes accepting image uploads.
    pub fn body_limit(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_size)
            .saturating_add(1024 * 1024)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., HEROES__DATABASE__URL)
            .add_source(
                Environment::with_prefix("HEROES")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .with_list_parse_key("upload.allowed_mime_types"),
            )
            .build()?;

        s.try_deserialize()
    }
}
