use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::anyhow;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    /// Page size of the first chat load, also the threshold for fetching older pages.
    pub initial_messages: i64,
    pub session_minutes: i64,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "sqlite://campusbuddy.db".to_owned(),
            upload_dir: PathBuf::from("uploads"),
            initial_messages: 20,
            session_minutes: 60,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Reads `.env` and the process environment, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            port: try_load("PORT", defaults.port)?,
            database_url: try_load("DATABASE_URL", defaults.database_url)?,
            upload_dir: try_load::<String>("UPLOAD_DIR", defaults.upload_dir.display().to_string())?.into(),
            initial_messages: try_load("INITIAL_MESSAGES", defaults.initial_messages)?,
            session_minutes: try_load("SESSION_MINUTES", defaults.session_minutes)?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(raw) = dotenv::var(key) else {
        info!("{key} not set, using default: {default}");
        return Ok(default);
    };

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("environment misconfigured: {key}={raw}: {e}")
    })
}
