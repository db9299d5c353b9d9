//! Redis connection configuration.

use std::env;

/// Redis configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379`)
/// - `CACHE_PREFIX`: Prefix for all keys (default: `clinic`)
/// - `LOCKOUT_RECORD_RETENTION_SECONDS`: How long an idle lockout record is
///   kept before Redis expires it (default: `86400`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub redis_url: String,

    /// Prefix for all keys to avoid collisions with other Redis users.
    pub key_prefix: String,

    pub record_retention_seconds: u64,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or_else(|_| "clinic".into()),
            record_retention_seconds: env::var("LOCKOUT_RECORD_RETENTION_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            key_prefix: "clinic".into(),
            record_retention_seconds: 86_400,
        }
    }
}
