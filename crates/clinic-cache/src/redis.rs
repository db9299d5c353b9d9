//! Redis connection handle shared by the stores in this crate.

use clinic_auth::AuthError;
use redis::{Client, aio::ConnectionManager};
use tracing::{error, info, instrument};

use crate::config::CacheConfig;

/// Cheap-to-clone Redis handle.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    retention_ms: u64,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("retention_ms", &self.retention_ms)
            .finish_non_exhaustive()
    }
}

/// Error type for Redis-backed stores.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Unexpected reply from Redis: {0}")]
    UnexpectedReply(String),
}

impl From<CacheError> for AuthError {
    fn from(err: CacheError) -> Self {
        error!(error = %err, "Redis store failure");
        AuthError::Store(err.to_string())
    }
}

impl RedisStore {
    /// Opens a managed connection.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL is invalid or Redis is unreachable.
    #[instrument(skip(config), fields(redis.prefix = %config.key_prefix))]
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis");

        Ok(Self {
            conn,
            prefix: config.key_prefix.clone(),
            retention_ms: config.record_retention_seconds.saturating_mul(1000),
        })
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::UnexpectedReply(reply));
        }
        Ok(())
    }
}
