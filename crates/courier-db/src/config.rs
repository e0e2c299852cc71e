use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DbError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Connection parameters for the pool.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite database file.
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long `acquire` waits for a free connection before failing.
    pub acquire_timeout: Duration,
    /// SQLite busy handler timeout, applied to every pooled connection.
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Read `DB_NAME` (required), `DB_POOL_SIZE`, `DB_ACQUIRE_TIMEOUT_SECS`
    /// and `DB_BUSY_TIMEOUT_MS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup("DB_NAME")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DbError::Config("DB_NAME is not set".into()))?;

        let mut config = Self::new(path);
        if let Some(n) = parse_var(&lookup, "DB_POOL_SIZE")? {
            if n == 0 {
                return Err(DbError::Config("DB_POOL_SIZE must be at least 1".into()));
            }
            config.max_connections = n;
        }
        if let Some(secs) = parse_var(&lookup, "DB_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, "DB_BUSY_TIMEOUT_MS")? {
            config.busy_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DbError::Config(format!("{} is not a valid number: {:?}", key, raw))),
    }
}
