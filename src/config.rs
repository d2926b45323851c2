use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::DEFAULT_ROSTER;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(StoreBackend::Mysql),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "STORE_BACKEND".to_string(),
                format!("expected mysql or memory, got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Mysql => f.write_str("mysql"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Server configuration, read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,

    // Database
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,

    // Uploads
    pub upload_dir: PathBuf,
    pub body_limit_bytes: usize,

    /// Staff members new reports are assigned to.
    pub roster: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = parse_var("PORT", &var("PORT", &DEFAULT_PORT.to_string()))?;
        let store_backend = var("STORE_BACKEND", "mysql").parse()?;
        let db_port = parse_var("DB_PORT", &var("DB_PORT", "3306"))?;
        let body_limit_bytes = parse_var(
            "BODY_LIMIT_BYTES",
            &var("BODY_LIMIT_BYTES", &DEFAULT_BODY_LIMIT_BYTES.to_string()),
        )?;

        let roster: Vec<String> = var("ASSIGNEE_ROSTER", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let roster = if roster.is_empty() {
            DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect()
        } else {
            roster
        };

        Ok(Config {
            port,
            store_backend,
            db_host: var("DB_HOST", "localhost"),
            db_port,
            db_user: var("DB_USER", "server"),
            db_password: var("DB_PASSWORD", "secret"),
            db_name: var("DB_NAME", "helpdesk"),
            upload_dir: PathBuf::from(var("UPLOAD_DIR", "./uploads")),
            body_limit_bytes,
            roster,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }

    /// Database URL safe to log.
    pub fn masked_database_url(&self) -> String {
        format!(
            "mysql://{}:****@{}:{}/{}",
            self.db_user, self.db_host, self.db_port, self.db_name
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidEnvVar("PORT".to_string(), "cannot be 0".to_string()));
        }

        if self.store_backend == StoreBackend::Mysql {
            if self.db_host.is_empty() {
                return Err(ConfigError::InvalidEnvVar("DB_HOST".to_string(), "cannot be empty".to_string()));
            }
            if self.db_user.is_empty() {
                return Err(ConfigError::InvalidEnvVar("DB_USER".to_string(), "cannot be empty".to_string()));
            }
            if self.db_name.is_empty() {
                return Err(ConfigError::InvalidEnvVar("DB_NAME".to_string(), "cannot be empty".to_string()));
            }
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidEnvVar("UPLOAD_DIR".to_string(), "cannot be empty".to_string()));
        }

        if self.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BODY_LIMIT_BYTES".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}
