//! Configuration Module
//!
//! Loads service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::store::StoreConfig;

/// Which key-value backend the cache runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote Redis server
    Redis,
    /// In-process map, for single-node deployments and local development
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store address
    pub redis_url: String,
    /// Per-attempt connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Connection attempts before the cache is considered unavailable
    pub max_retries: u32,
    /// Per-command timeout in milliseconds
    pub command_timeout_ms: u64,
    /// How long a give-up is remembered before redialling, in milliseconds
    pub retry_cooldown_ms: u64,
    /// Key-value backend
    pub backend: BackendKind,
    /// HTTP server port
    pub server_port: u16,
    /// Expired-entry sweep interval in seconds (memory backend)
    pub cleanup_interval: u64,
    /// Take rate-limit identity from `x-user-id`/`x-forwarded-for`
    pub trust_identity_headers: bool,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Store address (default: redis://localhost:6379)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 1000)
    /// - `REDIS_MAX_RETRIES` - Connect attempts (default: 3)
    /// - `REDIS_COMMAND_TIMEOUT_MS` - Command timeout (default: 1000)
    /// - `REDIS_RETRY_COOLDOWN_MS` - Fail-fast period after a give-up (default: 5000)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `TRUST_IDENTITY_HEADERS` - Only behind a proxy that sets them (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.redis_url),
            connect_timeout_ms: env_or("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            max_retries: env_or("REDIS_MAX_RETRIES", defaults.max_retries),
            command_timeout_ms: env_or("REDIS_COMMAND_TIMEOUT_MS", defaults.command_timeout_ms),
            retry_cooldown_ms: env_or("REDIS_RETRY_COOLDOWN_MS", defaults.retry_cooldown_ms),
            backend: env_or("CACHE_BACKEND", defaults.backend),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            trust_identity_headers: env_or(
                "TRUST_IDENTITY_HEADERS",
                defaults.trust_identity_headers,
            ),
        }
    }

    /// Connection parameters for the Redis backend.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.redis_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            max_retries: self.max_retries,
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            retry_cooldown: Duration::from_millis(self.retry_cooldown_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            connect_timeout_ms: 1000,
            max_retries: 3,
            command_timeout_ms: 1000,
            retry_cooldown_ms: 5000,
            backend: BackendKind::Redis,
            server_port: 3000,
            cleanup_interval: 1,
            trust_identity_headers: false,
        }
    }
}
