//! Lockout records in Redis.
//!
//! Each record is a hash `{failed, started_ms}` where `started_ms = -1` means
//! no lockout has been stamped. Both mutations run as Lua scripts, so the
//! read-modify-write is atomic per key across every API instance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_auth::{AuthError, LockoutPolicy, LockoutRecord, LockoutStore, RecordedFailure};
use redis::Script;
use tracing::instrument;

use crate::keys;
use crate::redis::{CacheError, RedisStore};

const RECORD_FAILURE: &str = r#"
local failed = tonumber(redis.call('HGET', KEYS[1], 'failed') or '0')
local started = tonumber(redis.call('HGET', KEYS[1], 'started_ms') or '-1')
local now = tonumber(ARGV[1])
local max_attempts = tonumber(ARGV[2])
local duration = tonumber(ARGV[3])

if started >= 0 and now >= started + duration then
    failed = 0
    started = -1
end

failed = failed + 1
local engaged = 0
if started < 0 and failed >= max_attempts then
    started = now
    engaged = 1
end

redis.call('HSET', KEYS[1], 'failed', failed, 'started_ms', started)
redis.call('PEXPIRE', KEYS[1], ARGV[4])
return {failed, started, engaged}
"#;

const RECORD_SUCCESS: &str = r#"
local started = tonumber(redis.call('HGET', KEYS[1], 'started_ms') or '-1')
local now = tonumber(ARGV[1])
local duration = tonumber(ARGV[2])

if started >= 0 and now < started + duration then
    redis.call('HSET', KEYS[1], 'failed', 0)
    return 1
end
redis.call('DEL', KEYS[1])
return 0
"#;

#[derive(Debug, Clone)]
pub struct RedisLockoutStore {
    redis: RedisStore,
}

impl RedisLockoutStore {
    pub fn new(redis: RedisStore) -> Self {
        Self { redis }
    }

    fn key(&self, client: &str) -> String {
        keys::lockout(self.redis.prefix(), client)
    }

    fn retention_ms(&self, policy: &LockoutPolicy) -> i64 {
        let window = policy.duration.num_milliseconds();
        (self.redis.retention_ms() as i64).max(window)
    }
}

fn started_at(started_ms: i64) -> Option<DateTime<Utc>> {
    if started_ms < 0 {
        None
    } else {
        DateTime::from_timestamp_millis(started_ms)
    }
}

fn record_from(failed: i64, started_ms: i64) -> LockoutRecord {
    LockoutRecord {
        failed_attempts: u32::try_from(failed.max(0)).unwrap_or(u32::MAX),
        lockout_started_at: started_at(started_ms),
    }
}

#[async_trait]
impl LockoutStore for RedisLockoutStore {
    #[instrument(skip(self), fields(cache.operation = "HMGET"))]
    async fn get(&self, key: &str) -> Result<Option<LockoutRecord>, AuthError> {
        let mut conn = self.redis.connection();
        let (failed, started_ms): (Option<i64>, Option<i64>) = redis::cmd("HMGET")
            .arg(self.key(key))
            .arg("failed")
            .arg("started_ms")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::from)?;

        Ok(failed.map(|failed| record_from(failed, started_ms.unwrap_or(-1))))
    }

    #[instrument(skip(self, policy), fields(cache.operation = "EVAL"))]
    async fn record_failure(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<RecordedFailure, AuthError> {
        let mut conn = self.redis.connection();
        let reply: Vec<i64> = Script::new(RECORD_FAILURE)
            .key(self.key(key))
            .arg(now.timestamp_millis())
            .arg(policy.max_attempts)
            .arg(policy.duration.num_milliseconds())
            .arg(self.retention_ms(policy))
            .invoke_async(&mut conn)
            .await
            .map_err(CacheError::from)?;

        match reply.as_slice() {
            [failed, started_ms, engaged] => Ok(RecordedFailure {
                record: record_from(*failed, *started_ms),
                engaged: *engaged == 1,
            }),
            _ => Err(CacheError::UnexpectedReply(format!("{:?}", reply)).into()),
        }
    }

    #[instrument(skip(self, policy), fields(cache.operation = "EVAL"))]
    async fn record_success(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<(), AuthError> {
        let mut conn = self.redis.connection();
        let _: i64 = Script::new(RECORD_SUCCESS)
            .key(self.key(key))
            .arg(now.timestamp_millis())
            .arg(policy.duration.num_milliseconds())
            .invoke_async(&mut conn)
            .await
            .map_err(CacheError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::config::CacheConfig;

    #[test]
    fn test_record_from_reply() {
        let record = record_from(3, -1);
        assert_eq!(record.failed_attempts, 3);
        assert_eq!(record.lockout_started_at, None);

        let stamped = record_from(5, 1_700_000_000_000);
        assert_eq!(
            stamped.lockout_started_at.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    async fn store() -> RedisLockoutStore {
        let config = CacheConfig {
            key_prefix: format!("clinic-test-{}", uuid::Uuid::new_v4()),
            ..CacheConfig::default()
        };
        RedisLockoutStore::new(RedisStore::connect(&config).await.unwrap())
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_failures_engage_lockout_once() {
        let store = store().await;
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        for attempt in 1..5 {
            let recorded = store.record_failure("10.0.0.5", now, &policy).await.unwrap();
            assert_eq!(recorded.record.failed_attempts, attempt);
            assert!(!recorded.engaged);
        }

        let fifth = store.record_failure("10.0.0.5", now, &policy).await.unwrap();
        assert!(fifth.engaged);

        let sixth = store
            .record_failure("10.0.0.5", now + Duration::minutes(1), &policy)
            .await
            .unwrap();
        assert!(!sixth.engaged);
        assert_eq!(
            sixth.record.lockout_started_at.map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_success_keeps_active_lockout() {
        let store = store().await;
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        for _ in 0..5 {
            store.record_failure("10.0.0.5", now, &policy).await.unwrap();
        }
        store.record_success("10.0.0.5", now, &policy).await.unwrap();

        let record = store.get("10.0.0.5").await.unwrap().unwrap();
        assert_eq!(record.failed_attempts, 0);
        assert!(record.is_locked(now, &policy));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_success_without_lockout_removes_record() {
        let store = store().await;
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        store.record_failure("10.0.0.7", now, &policy).await.unwrap();
        store.record_success("10.0.0.7", now, &policy).await.unwrap();
        assert!(store.get("10.0.0.7").await.unwrap().is_none());
    }
}
