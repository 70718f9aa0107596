//! Redis Store Module
//!
//! Lazily connected client for a remote Redis server. One multiplexed
//! connection is shared by every caller; it is established on first use,
//! re-established after it drops, and torn down by [`RedisStore::disconnect`].
//!
//! Callers arriving while a connect is in flight wait on that attempt and
//! share its outcome. A give-up is remembered for `retry_cooldown`, during
//! which every call fails immediately with [`StoreError::Unavailable`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult, Script};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use super::KvStore;
use crate::error::{StoreError, StoreResult};

/// Increment a counter and start its window on the first hit, atomically.
const INCR_WITH_EXPIRY_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Upper bound on the pause between two connection attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

// == Store Config ==
/// Connection parameters for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL (e.g. "redis://localhost:6379")
    pub url: String,
    /// Deadline for a single connection attempt
    pub connect_timeout: Duration,
    /// Connection attempts before giving up
    pub max_retries: u32,
    /// Deadline for a single command round trip
    pub command_timeout: Duration,
    /// How long a failed connect cycle is reused before redialling
    pub retry_cooldown: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(1),
            max_retries: 3,
            command_timeout: Duration::from_secs(1),
            retry_cooldown: Duration::from_secs(5),
        }
    }
}

// == Connect Attempt ==
/// A connect cycle that ran out of attempts.
#[derive(Debug, Clone)]
struct GaveUp {
    attempts: u32,
    reason: String,
    at: Instant,
}

impl GaveUp {
    fn error(&self) -> StoreError {
        StoreError::Unavailable {
            attempts: self.attempts,
            reason: self.reason.clone(),
        }
    }
}

/// One connect cycle. Resolved once, then read by every caller holding it.
type Attempt = Arc<OnceCell<Result<MultiplexedConnection, GaveUp>>>;

// == Redis Store ==
/// Shared, lazily established connection to a Redis server.
pub struct RedisStore {
    client: Client,
    config: StoreConfig,
    /// Current connect cycle: pending, connected or given up.
    connection: Mutex<Option<Attempt>>,
    incr_with_expiry: Script,
}

impl RedisStore {
    // == Constructor ==
    /// Validates the URL and prepares the client. No connection is made yet.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(|source| StoreError::Command {
            command: "CONNECT",
            source,
        })?;

        Ok(Self {
            client,
            config,
            connection: Mutex::new(None),
            incr_with_expiry: Script::new(INCR_WITH_EXPIRY_SCRIPT),
        })
    }

    // == Connection ==
    /// Returns the shared handle, joining or starting a connect cycle when
    /// there is none. The slot lock is only held to pick the cycle.
    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        let attempt = {
            let mut slot = self.connection.lock().await;
            let expired = match slot.as_ref().and_then(|attempt| attempt.get()) {
                Some(Ok(conn)) => return Ok(conn.clone()),
                Some(Err(gave_up)) if gave_up.at.elapsed() < self.config.retry_cooldown => {
                    return Err(gave_up.error())
                }
                Some(Err(_)) => true,
                None => false,
            };
            if expired {
                *slot = None;
            }
            slot.get_or_insert_with(Default::default).clone()
        };

        match attempt.get_or_init(|| self.connect()).await {
            Ok(conn) => Ok(conn.clone()),
            Err(gave_up) => Err(gave_up.error()),
        }
    }

    /// Bounded connect loop with linear backoff.
    async fn connect(&self) -> Result<MultiplexedConnection, GaveUp> {
        let addr = &self.client.get_connection_info().addr;
        let attempts = self.config.max_retries.max(1);
        let mut reason = String::new();

        for attempt in 1..=attempts {
            debug!(%addr, attempt, "Connecting to store");

            match tokio::time::timeout(
                self.config.connect_timeout,
                self.client.get_multiplexed_async_connection(),
            )
            .await
            {
                Ok(Ok(conn)) => {
                    info!(%addr, attempt, "Connected to store");
                    return Ok(conn);
                }
                Ok(Err(err)) => reason = err.to_string(),
                Err(_) => {
                    reason = format!(
                        "connect timed out after {}ms",
                        self.config.connect_timeout.as_millis()
                    )
                }
            }

            warn!(%addr, attempt, max_attempts = attempts, error = %reason, "Store connection attempt failed");

            if attempt < attempts {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        error!(
            %addr,
            attempts,
            cooldown_ms = self.config.retry_cooldown.as_millis() as u64,
            "Giving up on store connection, cache unavailable"
        );
        Err(GaveUp {
            attempts,
            reason,
            at: Instant::now(),
        })
    }

    /// Forgets the current cycle if it holds a live connection.
    async fn release(&self) -> bool {
        let mut slot = self.connection.lock().await;
        let connected = matches!(slot.as_ref().and_then(|attempt| attempt.get()), Some(Ok(_)));
        if connected {
            *slot = None;
        }
        connected
    }

    // == Disconnect ==
    /// Drops the shared handle. Safe to call any number of times.
    pub async fn disconnect(&self) {
        if self.release().await {
            info!("Disconnected from store");
        }
    }

    /// Whether a connection handle is currently held.
    pub async fn is_connected(&self) -> bool {
        let slot = self.connection.lock().await;
        matches!(slot.as_ref().and_then(|attempt| attempt.get()), Some(Ok(_)))
    }

    /// Runs one command under the per-call deadline. A dropped connection
    /// clears the shared handle so the next call reconnects.
    async fn run<T, F>(&self, command: &'static str, request: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.config.command_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                let lost = source.is_connection_dropped()
                    || source.is_io_error()
                    || source.is_connection_refusal();
                if lost && self.release().await {
                    warn!(command, error = %source, "Store connection lost, will reconnect on next use");
                }
                Err(StoreError::Command { command, source })
            }
            Err(_) => Err(StoreError::Timeout { command }),
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(u64::from(attempt) * 100).min(MAX_BACKOFF)
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection().await?;
        self.run("GET", conn.get(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        self.run("SETEX", conn.set_ex(key, value, ttl_secs)).await
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        self.run("DEL", conn.del(keys.to_vec())).await
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection().await?;
        self.run("KEYS", conn.keys(pattern)).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        self.run("EXISTS", conn.exists(key)).await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl_secs);

        let reply = self
            .run::<Option<String>, _>("SET", cmd.query_async(&mut conn))
            .await?;
        Ok(reply.is_some())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.connection().await?;
        self.run("INCR", conn.incr(key, 1)).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let seconds = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        self.run("EXPIRE", conn.expire(key, seconds)).await
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> StoreResult<i64> {
        let mut conn = self.connection().await?;
        let mut invocation = self.incr_with_expiry.prepare_invoke();
        invocation.key(key).arg(ttl_secs);

        self.run::<i64, _>("EVALSHA", invocation.invoke_async(&mut conn))
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        self.run::<String, _>("PING", redis::cmd("PING").query_async(&mut conn))
            .await
            .map(|_| ())
    }
}
