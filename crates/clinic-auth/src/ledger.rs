//! Single-use bookkeeping for refresh tokens.
//!
//! A refresh token's `jti` is recorded the first time it is spent. A second
//! attempt with the same token is refused. Entries only need to outlive the
//! token itself, after which expiry validation rejects it anyway.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_core::SharedClock;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::AuthError;

#[async_trait]
pub trait RefreshTokenLedger: Send + Sync + Debug {
    /// Marks `jti` as spent. Returns `false` if it had already been spent.
    async fn consume(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError>;
}

#[derive(Debug)]
pub struct MemoryRefreshLedger {
    spent: DashMap<String, DateTime<Utc>>,
    clock: SharedClock,
}

impl MemoryRefreshLedger {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            spent: DashMap::new(),
            clock,
        }
    }

    /// Drops entries whose tokens have expired.
    ///
    /// Compared in whole seconds, the same resolution as the token's `exp`, so
    /// an entry lives as long as its token still validates.
    pub fn purge_expired(&self) {
        let now = self.clock.now().timestamp();
        self.spent
            .retain(|_, expires_at| expires_at.timestamp() >= now);
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}

#[async_trait]
impl RefreshTokenLedger for MemoryRefreshLedger {
    async fn consume(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError> {
        match self.spent.entry(jti.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use clinic_core::{Clock, ManualClock};

    use super::*;

    #[tokio::test]
    async fn test_consume_once() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = MemoryRefreshLedger::new(clock.clone());
        let expires_at = clock.now() + Duration::days(7);

        assert!(ledger.consume("jti-1", expires_at).await.unwrap());
        assert!(!ledger.consume("jti-1", expires_at).await.unwrap());
        assert!(ledger.consume("jti-2", expires_at).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = MemoryRefreshLedger::new(clock.clone());

        ledger
            .consume("short", clock.now() + Duration::minutes(1))
            .await
            .unwrap();
        ledger
            .consume("long", clock.now() + Duration::days(7))
            .await
            .unwrap();

        clock.advance(Duration::minutes(2));
        ledger.purge_expired();

        assert_eq!(ledger.len(), 1);
        assert!(!ledger.consume("long", clock.now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_survives_final_second_of_token() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let ledger = MemoryRefreshLedger::new(clock.clone());
        let expires_at = start + Duration::seconds(60);

        ledger.consume("jti-1", expires_at).await.unwrap();

        // Still inside the second named by `exp`: the token validates, so the
        // entry must stay.
        clock.advance(Duration::seconds(60) + Duration::milliseconds(500));
        ledger.purge_expired();
        assert!(!ledger.consume("jti-1", expires_at).await.unwrap());

        clock.advance(Duration::seconds(1));
        ledger.purge_expired();
        assert!(ledger.is_empty());
    }
}
