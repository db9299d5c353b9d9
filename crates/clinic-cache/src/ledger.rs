use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_auth::{AuthError, RefreshTokenLedger};
use clinic_core::SharedClock;
use tracing::{debug, instrument};

use crate::keys;
use crate::redis::{CacheError, RedisStore};

/// Spent refresh tokens, one `SET NX` key each, expiring with the token.
#[derive(Debug, Clone)]
pub struct RedisRefreshLedger {
    redis: RedisStore,
    clock: SharedClock,
}

impl RedisRefreshLedger {
    pub fn new(redis: RedisStore, clock: SharedClock) -> Self {
        Self { redis, clock }
    }
}

/// Keeps the key through the whole second named by the token's `exp`.
fn ttl_ms(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> i64 {
    let last_valid_instant = expires_at.timestamp() + 1;
    let until = DateTime::from_timestamp(last_valid_instant, 0).unwrap_or(expires_at);
    (until - now).num_milliseconds().max(1_000)
}

#[async_trait]
impl RefreshTokenLedger for RedisRefreshLedger {
    #[instrument(skip_all, fields(cache.operation = "SET NX"))]
    async fn consume(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError> {
        let mut conn = self.redis.connection();
        let reply: Option<String> = redis::cmd("SET")
            .arg(keys::spent_refresh(self.redis.prefix(), jti))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms(self.clock.now(), expires_at))
            .query_async(&mut conn)
            .await
            .map_err(CacheError::from)?;

        let fresh = reply.is_some();
        debug!(fresh, "Refresh token consumed");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use clinic_core::SystemClock;

    use super::*;
    use crate::config::CacheConfig;

    #[test]
    fn test_ttl_has_floor() {
        let now = Utc::now();
        assert_eq!(ttl_ms(now, now - Duration::seconds(30)), 1_000);
    }

    #[test]
    fn test_ttl_covers_final_second_of_token() {
        let now = DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap();
        let expires_at = DateTime::from_timestamp(1_700_000_030, 0).unwrap();
        // The token validates until 1_700_000_031 exclusive.
        assert_eq!(ttl_ms(now, expires_at), 30_750);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_consume_once() {
        let config = CacheConfig {
            key_prefix: format!("clinic-test-{}", uuid::Uuid::new_v4()),
            ..CacheConfig::default()
        };
        let redis = RedisStore::connect(&config).await.unwrap();
        let ledger = RedisRefreshLedger::new(redis, Arc::new(SystemClock));
        let expires_at = Utc::now() + Duration::days(7);

        assert!(ledger.consume("jti-1", expires_at).await.unwrap());
        assert!(!ledger.consume("jti-1", expires_at).await.unwrap());
    }
}
