use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Bootstrap admin account, created on startup if missing.
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Where uploaded artifacts live on disk.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Permanent APK storage. Default: "./uploads/apk".
    #[serde(default = "default_apk_dir")]
    pub apk_dir: PathBuf,
    /// Chunk and session state of in-flight uploads. Default: "./uploads/chunks".
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// URL prefix recorded as the public download path. Default: "/uploads/apk".
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

fn default_apk_dir() -> PathBuf {
    PathBuf::from("./uploads/apk")
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads/chunks")
}
fn default_public_prefix() -> String {
    "/uploads/apk".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            apk_dir: default_apk_dir(),
            upload_dir: default_upload_dir(),
            public_prefix: default_public_prefix(),
        }
    }
}

/// Limits and housekeeping for APK uploads.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Maximum bytes per chunk. Default: 10 MiB.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
    /// Maximum number of chunks one upload may declare. Default: 1000.
    #[serde(default = "default_max_total_chunks")]
    pub max_total_chunks: u32,
    /// Maximum size of a direct single-shot APK upload. Default: 200 MiB.
    #[serde(default = "default_max_apk_size")]
    pub max_apk_size: u64,
    /// After this many seconds a stuck completion no longer blocks its session. Default: 600.
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
    /// Abandoned sessions older than this are swept. Disabled when unset.
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,
    /// How often the sweeper runs. Default: 3600.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_chunk_size() -> u64 {
    10 * 1024 * 1024
}
fn default_max_total_chunks() -> u32 {
    1000
}
fn default_max_apk_size() -> u64 {
    200 * 1024 * 1024
}
fn default_completion_timeout_secs() -> u64 {
    600
}
fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            max_total_chunks: default_max_total_chunks(),
            max_apk_size: default_max_apk_size(),
            completion_timeout_secs: default_completion_timeout_secs(),
            session_ttl_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Maximum records per bulk sync request. Default: 50.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_max_batch_size() -> usize {
    50
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CMO__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CMO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
