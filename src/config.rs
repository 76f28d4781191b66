use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use snafu::ResultExt;

use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::logger::ConsoleFormat;
use crate::storage::Storage;

/// Settings read from the environment, see `.env.example`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address", default = "default_host")]
    pub host: SocketAddr,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Largest accepted upload body, in bytes.
    #[serde(default = "default_upload_limit")]
    pub upload_limit: usize,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub log_console: ConsoleFormat,
    /// Only send the session cookie over HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Seconds a session may stay unused before it is dropped.
    #[serde(rename = "session_idle_secs", default = "default_session_idle")]
    pub session_idle: u64,
    #[serde(flatten)]
    pub database: DatabaseConfig,
}

fn default_host() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_url() -> String {
    "/uploads".to_string()
}

fn default_upload_limit() -> usize {
    100 * 1024 * 1024
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_session_idle() -> u64 {
    7 * 24 * 60 * 60
}

impl Config {
    pub fn storage(&self) -> Storage {
        Storage::new(self.upload_dir.clone(), self.public_url.clone())
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle)
    }
}

pub fn load() -> Result<Config, ApplicationError> {
    envy::from_env::<Config>().context(ConfigLoadSnafu)
}
