//! Billing service configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                  | Default      |
//! |---------------------------|--------------|
//! | `KIRANA_DB_PATH`          | `kirana.db`  |
//! | `KIRANA_STORE_ID`         | [`DEFAULT_STORE_ID`] |
//! | `KIRANA_MAX_CONNECTIONS`  | `5`          |
//! | `KIRANA_BUSY_TIMEOUT_MS`  | `5000`       |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use kirana_core::DEFAULT_STORE_ID;
use kirana_db::DbConfig;

/// Billing service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Store this counter bills for
    pub store_id: String,

    /// Pool size
    pub max_connections: u32,

    /// How long a checkout waits for another counter's write lock
    pub busy_timeout_ms: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        BillingConfig {
            database_path: PathBuf::from("kirana.db"),
            store_id: DEFAULT_STORE_ID.to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl BillingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (the environment in production,
    /// a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = BillingConfig::default();

        let config = BillingConfig {
            database_path: lookup("KIRANA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            store_id: lookup("KIRANA_STORE_ID").unwrap_or(defaults.store_id),

            max_connections: match lookup("KIRANA_MAX_CONNECTIONS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("KIRANA_MAX_CONNECTIONS".to_string()))?,
                None => defaults.max_connections,
            },

            busy_timeout_ms: match lookup("KIRANA_BUSY_TIMEOUT_MS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("KIRANA_BUSY_TIMEOUT_MS".to_string()))?,
                None => defaults.busy_timeout_ms,
            },
        };

        if config.store_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("KIRANA_STORE_ID".to_string()));
        }
        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("KIRANA_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
