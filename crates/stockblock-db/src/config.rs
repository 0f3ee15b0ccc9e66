//! Runtime configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                              | Default            |
//! |---------------------------------------|--------------------|
//! | `STOCKBLOCK_DB_PATH`                  | `./stockblock.db`  |
//! | `STOCKBLOCK_DB_MAX_CONNECTIONS`       | `5`                |
//! | `STOCKBLOCK_DB_BUSY_TIMEOUT_MS`       | `5000`             |
//! | `STOCKBLOCK_RESERVATION_WINDOW_SECS`  | `3600` (1 hour)    |

use std::env;
use std::time::Duration;

use stockblock_core::{ReservationConfig, DEFAULT_RESERVATION_WINDOW_SECS};

use crate::pool::DbConfig;

pub const ENV_DB_PATH: &str = "STOCKBLOCK_DB_PATH";
pub const ENV_DB_MAX_CONNECTIONS: &str = "STOCKBLOCK_DB_MAX_CONNECTIONS";
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "STOCKBLOCK_DB_BUSY_TIMEOUT_MS";
pub const ENV_RESERVATION_WINDOW_SECS: &str = "STOCKBLOCK_RESERVATION_WINDOW_SECS";

const DEFAULT_DB_PATH: &str = "./stockblock.db";

/// Everything a process needs to open the store and run the engine.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db: DbConfig,
    pub reservation: ReservationConfig,
}

impl Settings {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        if path.trim().is_empty() {
            return Err(ConfigError::InvalidValue(ENV_DB_PATH.to_string()));
        }

        let max_connections: u32 = parse_or(&lookup, ENV_DB_MAX_CONNECTIONS, 5)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(ENV_DB_MAX_CONNECTIONS.to_string()));
        }

        let busy_timeout_ms: u64 = parse_or(&lookup, ENV_DB_BUSY_TIMEOUT_MS, 5000)?;

        let window_secs: i64 = parse_or(
            &lookup,
            ENV_RESERVATION_WINDOW_SECS,
            DEFAULT_RESERVATION_WINDOW_SECS,
        )?;
        let window = chrono::Duration::try_seconds(window_secs)
            .filter(|window| *window > chrono::Duration::zero())
            .ok_or_else(|| ConfigError::InvalidValue(ENV_RESERVATION_WINDOW_SECS.to_string()))?;

        let mut db = DbConfig::new(path)
            .max_connections(max_connections)
            .busy_timeout(Duration::from_millis(busy_timeout_ms));
        if db.is_in_memory() {
            db = DbConfig::in_memory().busy_timeout(Duration::from_millis(busy_timeout_ms));
        }

        Ok(Settings {
            db,
            reservation: ReservationConfig::default().reservation_window(window),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
