use std::env;

use crate::error::SyncError;

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sync: SyncConfig,
    pub client: ClientConfig,
    pub log: LogConfig,
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, SyncError> {
        dotenv::dotenv().ok();
        Ok(Self {
            sync: SyncConfig::load()?,
            client: ClientConfig::load()?,
            log: LogConfig::load()?,
        })
    }
}

// --- MODULES ---

// SYNC
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records buffered between scanner and restorer
    pub queue_capacity: usize,
    /// COUNT hint for SCAN, 0 leaves the batch size to the server
    pub scan_count: usize,
}

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

impl SyncConfig {
    fn load() -> Result<Self, SyncError> {
        let cfg = Self {
            queue_capacity: get_env("RUMP_QUEUE_CAPACITY", "100")?,
            scan_count:     get_env("RUMP_SCAN_COUNT", "0")?,
        };
        if cfg.queue_capacity == 0 {
            return Err(SyncError::Config("RUMP_QUEUE_CAPACITY must be at least 1".to_string()));
        }
        Ok(cfg)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            scan_count: 0,
        }
    }
}

// CLIENT
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
}

impl ClientConfig {
    fn load() -> Result<Self, SyncError> {
        let cfg = Self {
            connect_timeout_ms: get_env("RUMP_CONNECT_TIMEOUT_MS", "5000")?,
        };
        if cfg.connect_timeout_ms == 0 {
            return Err(SyncError::Config("RUMP_CONNECT_TIMEOUT_MS must be at least 1".to_string()));
        }
        Ok(cfg)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { connect_timeout_ms: 5000 }
    }
}

// LOG
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
}

impl LogConfig {
    fn load() -> Result<Self, SyncError> {
        Ok(Self {
            level: get_env("RUMP_LOG", "error")?,
        })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "error".to_string() }
    }
}

// --- PRIVATE HELPER ---

fn get_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, SyncError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, SyncError> {
    raw.trim()
        .parse()
        .map_err(|_| SyncError::Config(format!("{} must be valid, got {:?}", key, raw)))
}
