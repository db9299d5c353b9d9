//! Per-client brute-force lockout.
//!
//! Each client key (normally the peer IP address) has a [`LockoutRecord`]
//! counting consecutive failed logins. When the count reaches the policy
//! threshold the record is stamped with the time the lockout started, and the
//! client stays locked out until `lockout_started_at + duration`.
//!
//! Stale records are never swept eagerly: once the window has passed the
//! record is treated as empty, and the next failure starts counting from one.
//!
//! A successful login clears the counter but never an active lockout, so a
//! client that guesses right while locked out still waits out the window.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clinic_config::LockoutConfig;
use clinic_core::SharedClock;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from(&LockoutConfig::default())
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(config: &LockoutConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            duration: Duration::seconds(config.lockout_duration_secs as i64),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutRecord {
    pub failed_attempts: u32,
    pub lockout_started_at: Option<DateTime<Utc>>,
}

impl LockoutRecord {
    pub fn lockout_ends_at(&self, policy: &LockoutPolicy) -> Option<DateTime<Utc>> {
        self.lockout_started_at.map(|started| started + policy.duration)
    }

    pub fn is_locked(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        self.lockout_ends_at(policy).is_some_and(|ends| now < ends)
    }

    /// A lockout window that has fully elapsed.
    pub fn is_stale(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        self.lockout_ends_at(policy).is_some_and(|ends| now >= ends)
    }

    /// The record as it should be read at `now`.
    pub fn effective(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> LockoutRecord {
        if self.is_stale(now, policy) {
            LockoutRecord::default()
        } else {
            *self
        }
    }

    /// Applies one failed attempt. Returns whether this failure engaged the lockout.
    pub fn apply_failure(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        *self = self.effective(now, policy);
        self.failed_attempts = self.failed_attempts.saturating_add(1);

        if self.lockout_started_at.is_none() && self.failed_attempts >= policy.max_attempts {
            self.lockout_started_at = Some(now);
            return true;
        }
        false
    }

    /// Clears the counter. Returns `false` when nothing worth keeping remains.
    pub fn apply_success(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        *self = self.effective(now, policy);
        self.failed_attempts = 0;
        self.lockout_started_at.is_some()
    }

    pub fn remaining_attempts(&self, policy: &LockoutPolicy) -> u32 {
        policy.max_attempts.saturating_sub(self.failed_attempts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedFailure {
    pub record: LockoutRecord,
    pub engaged: bool,
}

/// Storage for lockout records.
///
/// Implementations must make `record_failure` and `record_success` atomic per
/// key. No ordering across keys is required.
#[async_trait]
pub trait LockoutStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<LockoutRecord>, AuthError>;

    async fn record_failure(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<RecordedFailure, AuthError>;

    async fn record_success(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<(), AuthError>;
}

#[derive(Debug, Default)]
pub struct MemoryLockoutStore {
    records: DashMap<String, LockoutRecord>,
}

impl MemoryLockoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops records with no failures and no live lockout.
    pub fn purge_stale(&self, now: DateTime<Utc>, policy: &LockoutPolicy) {
        self.records.retain(|_, record| {
            let effective = record.effective(now, policy);
            effective.failed_attempts > 0 || effective.lockout_started_at.is_some()
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LockoutStore for MemoryLockoutStore {
    async fn get(&self, key: &str) -> Result<Option<LockoutRecord>, AuthError> {
        Ok(self.records.get(key).map(|record| *record))
    }

    async fn record_failure(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<RecordedFailure, AuthError> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut record = self.records.entry(key.to_string()).or_default();
        let engaged = record.apply_failure(now, policy);
        Ok(RecordedFailure {
            record: *record,
            engaged,
        })
    }

    async fn record_success(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<(), AuthError> {
        if let Entry::Occupied(mut entry) = self.records.entry(key.to_string()) {
            if !entry.get_mut().apply_success(now, policy) {
                entry.remove();
            }
        }
        Ok(())
    }
}

/// Outcome of a recorded failure, as reported to the login endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutStatus {
    /// This failure is the one that triggered the lockout.
    pub engaged: bool,
    /// The client is locked out after this failure.
    pub locked: bool,
    pub remaining_attempts: u32,
    pub retry_after: Option<Duration>,
}

impl LockoutStatus {
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(duration_secs_ceil)
    }
}

fn duration_secs_ceil(duration: Duration) -> u64 {
    let millis = duration.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

#[derive(Debug, Clone)]
pub struct LockoutTracker {
    store: Arc<dyn LockoutStore>,
    policy: LockoutPolicy,
    clock: SharedClock,
}

impl LockoutTracker {
    pub fn new(store: Arc<dyn LockoutStore>, policy: LockoutPolicy, clock: SharedClock) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    async fn current(&self, key: &str) -> Result<LockoutRecord, AuthError> {
        let now = self.clock.now();
        Ok(self
            .store
            .get(key)
            .await?
            .map(|record| record.effective(now, &self.policy))
            .unwrap_or_default())
    }

    pub async fn is_locked_out(&self, key: &str) -> Result<bool, AuthError> {
        let now = self.clock.now();
        Ok(self.current(key).await?.is_locked(now, &self.policy))
    }

    pub async fn record_failure(&self, key: &str) -> Result<LockoutStatus, AuthError> {
        let now = self.clock.now();
        let RecordedFailure { record, engaged } =
            self.store.record_failure(key, now, &self.policy).await?;

        let locked = record.is_locked(now, &self.policy);
        let retry_after = record
            .lockout_ends_at(&self.policy)
            .filter(|_| locked)
            .map(|ends| ends - now);

        if engaged {
            warn!(
                client = %key,
                failed_attempts = record.failed_attempts,
                lockout_secs = self.policy.duration.num_seconds(),
                "Client locked out after repeated login failures"
            );
        }

        Ok(LockoutStatus {
            engaged,
            locked,
            remaining_attempts: record.remaining_attempts(&self.policy),
            retry_after,
        })
    }

    pub async fn record_success(&self, key: &str) -> Result<(), AuthError> {
        let now = self.clock.now();
        self.store.record_success(key, now, &self.policy).await?;
        info!(client = %key, "Failed login counter cleared");
        Ok(())
    }

    pub async fn remaining_attempts(&self, key: &str) -> Result<u32, AuthError> {
        Ok(self.current(key).await?.remaining_attempts(&self.policy))
    }

    /// Time left on an active lockout.
    pub async fn retry_after(&self, key: &str) -> Result<Option<Duration>, AuthError> {
        let now = self.clock.now();
        let record = self.current(key).await?;
        Ok(record
            .lockout_ends_at(&self.policy)
            .filter(|ends| now < *ends)
            .map(|ends| ends - now))
    }

    /// Fails with [`AuthError::LockedOut`] while `key` is locked out.
    pub async fn ensure_not_locked(&self, key: &str) -> Result<(), AuthError> {
        match self.retry_after(key).await? {
            Some(remaining) => Err(AuthError::LockedOut {
                retry_after_secs: duration_secs_ceil(remaining),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use clinic_core::ManualClock;

    use super::*;

    const CLIENT: &str = "10.0.0.5";

    fn tracker() -> (LockoutTracker, Arc<ManualClock>, Arc<MemoryLockoutStore>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryLockoutStore::new());
        let tracker = LockoutTracker::new(store.clone(), LockoutPolicy::default(), clock.clone());
        (tracker, clock, store)
    }

    #[tokio::test]
    async fn test_lockout_engages_on_fifth_failure() {
        let (tracker, _, _) = tracker();

        for expected_remaining in (1..5).rev() {
            let status = tracker.record_failure(CLIENT).await.unwrap();
            assert!(!status.engaged);
            assert!(!status.locked);
            assert_eq!(status.remaining_attempts, expected_remaining);
            assert!(!tracker.is_locked_out(CLIENT).await.unwrap());
        }

        let status = tracker.record_failure(CLIENT).await.unwrap();
        assert!(status.engaged);
        assert!(status.locked);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.retry_after_secs(), Some(600));
        assert!(tracker.is_locked_out(CLIENT).await.unwrap());
    }

    #[tokio::test]
    async fn test_extra_failure_does_not_extend_window() {
        let (tracker, clock, _) = tracker();
        for _ in 0..5 {
            tracker.record_failure(CLIENT).await.unwrap();
        }

        clock.advance(Duration::minutes(4));
        let status = tracker.record_failure(CLIENT).await.unwrap();
        assert!(!status.engaged);
        assert!(status.locked);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.retry_after_secs(), Some(360));

        clock.advance(Duration::minutes(6));
        assert!(!tracker.is_locked_out(CLIENT).await.unwrap());
    }

    #[tokio::test]
    async fn test_success_while_locked_keeps_lockout() {
        let (tracker, clock, _) = tracker();
        for _ in 0..5 {
            tracker.record_failure(CLIENT).await.unwrap();
        }

        tracker.record_success(CLIENT).await.unwrap();
        assert!(tracker.is_locked_out(CLIENT).await.unwrap());

        clock.advance(Duration::minutes(10));
        assert!(!tracker.is_locked_out(CLIENT).await.unwrap());
        assert_eq!(tracker.remaining_attempts(CLIENT).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let (tracker, _, store) = tracker();
        tracker.record_failure(CLIENT).await.unwrap();
        tracker.record_failure(CLIENT).await.unwrap();
        assert_eq!(tracker.remaining_attempts(CLIENT).await.unwrap(), 3);

        tracker.record_success(CLIENT).await.unwrap();
        assert_eq!(tracker.remaining_attempts(CLIENT).await.unwrap(), 5);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failure_after_window_starts_fresh() {
        let (tracker, clock, _) = tracker();
        for _ in 0..5 {
            tracker.record_failure(CLIENT).await.unwrap();
        }

        clock.advance(Duration::minutes(10));
        let status = tracker.record_failure(CLIENT).await.unwrap();
        assert!(!status.locked);
        assert_eq!(status.remaining_attempts, 4);
    }

    #[tokio::test]
    async fn test_remaining_attempts_is_monotonic_and_floored() {
        let (tracker, _, _) = tracker();
        let mut previous = tracker.remaining_attempts(CLIENT).await.unwrap();
        for _ in 0..8 {
            tracker.record_failure(CLIENT).await.unwrap();
            let remaining = tracker.remaining_attempts(CLIENT).await.unwrap();
            assert!(remaining <= previous);
            previous = remaining;
        }
        assert_eq!(previous, 0);
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let (tracker, _, _) = tracker();
        for _ in 0..5 {
            tracker.record_failure(CLIENT).await.unwrap();
        }
        assert!(tracker.is_locked_out(CLIENT).await.unwrap());
        assert!(!tracker.is_locked_out("10.0.0.6").await.unwrap());
        assert_eq!(tracker.remaining_attempts("10.0.0.6").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_ensure_not_locked() {
        let (tracker, _, _) = tracker();
        assert!(tracker.ensure_not_locked(CLIENT).await.is_ok());
        for _ in 0..5 {
            tracker.record_failure(CLIENT).await.unwrap();
        }
        match tracker.ensure_not_locked(CLIENT).await {
            Err(AuthError::LockedOut { retry_after_secs }) => assert_eq!(retry_after_secs, 600),
            other => panic!("expected lockout, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_not_lost() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryLockoutStore::new());
        let policy = LockoutPolicy {
            max_attempts: 1_000,
            duration: Duration::minutes(10),
        };
        let tracker = Arc::new(LockoutTracker::new(store.clone(), policy, clock));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    tracker.record_failure(CLIENT).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.get(CLIENT).await.unwrap().unwrap();
        assert_eq!(record.failed_attempts, 500);
    }

    #[test]
    fn test_purge_stale_records() {
        let store = MemoryLockoutStore::new();
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        store.records.insert(
            "stale".to_string(),
            LockoutRecord {
                failed_attempts: 5,
                lockout_started_at: Some(now - Duration::minutes(11)),
            },
        );
        store.records.insert(
            "active".to_string(),
            LockoutRecord {
                failed_attempts: 2,
                lockout_started_at: None,
            },
        );

        store.purge_stale(now, &policy);
        assert_eq!(store.len(), 1);
        assert!(store.records.contains_key("active"));
    }
}
