//! Username to principal resolution.
//!
//! The super-admin is a shared-secret login rather than a stored account, so it
//! is matched first against the configured secret. Everything else dispatches
//! on the username's first character to exactly one store; a miss in that store
//! is a miss, never a fallback to the others.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use clinic_config::SuperAdminConfig;
use clinic_models::{Account, Principal, PrincipalKind, Role, SUPER_ADMIN_SUBJECT};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::error::AuthError;

/// Lookup capability over the user, doctor and admin stores.
#[async_trait]
pub trait PrincipalStore: Send + Sync + Debug {
    async fn find_by_username(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> Result<Option<Account>, AuthError>;
}

#[derive(Debug, Default)]
pub struct MemoryPrincipalStore {
    accounts: DashMap<(PrincipalKind, String), Account>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: PrincipalKind, account: Account) {
        self.accounts
            .insert((kind, account.username.clone()), account);
    }

    pub fn remove(&self, kind: PrincipalKind, username: &str) -> Option<Account> {
        self.accounts
            .remove(&(kind, username.to_string()))
            .map(|(_, account)| account)
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_username(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> Result<Option<Account>, AuthError> {
        Ok(self
            .accounts
            .get(&(kind, username.to_string()))
            .map(|entry| entry.value().clone()))
    }
}

#[derive(Clone)]
pub struct PrincipalResolver {
    store: Arc<dyn PrincipalStore>,
    super_admin_digest: Option<[u8; 32]>,
}

impl Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("store", &self.store)
            .field("super_admin_enabled", &self.super_admin_digest.is_some())
            .finish()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl PrincipalResolver {
    pub fn new(store: Arc<dyn PrincipalStore>, super_admin: &SuperAdminConfig) -> Self {
        Self {
            store,
            super_admin_digest: super_admin.secret_key.as_deref().map(digest),
        }
    }

    pub fn super_admin_enabled(&self) -> bool {
        self.super_admin_digest.is_some()
    }

    /// Compares fixed-size digests so the comparison time does not depend on
    /// how much of the secret matched.
    pub fn is_super_admin_secret(&self, candidate: &str) -> bool {
        let Some(expected) = self.super_admin_digest else {
            return false;
        };
        let actual = digest(candidate);
        expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Resolves a login username.
    #[instrument(skip_all)]
    pub async fn resolve(&self, username: &str) -> Result<Principal, AuthError> {
        if self.is_super_admin_secret(username) {
            return Ok(Principal::SuperAdmin);
        }

        let Some(kind) = PrincipalKind::from_username(username) else {
            debug!("Username prefix matches no principal kind");
            return Err(AuthError::PrincipalNotFound);
        };

        self.lookup(kind, username).await
    }

    /// Re-resolves a token subject and checks it still carries `role`.
    #[instrument(skip(self))]
    pub async fn resolve_subject(&self, subject: &str, role: Role) -> Result<Principal, AuthError> {
        match PrincipalKind::from_role(role) {
            None => {
                if subject == SUPER_ADMIN_SUBJECT && self.super_admin_enabled() {
                    Ok(Principal::SuperAdmin)
                } else {
                    Err(AuthError::PrincipalNotFound)
                }
            }
            Some(kind) => {
                if PrincipalKind::from_username(subject) != Some(kind) {
                    debug!("Token subject does not belong to the role's store");
                    return Err(AuthError::PrincipalNotFound);
                }
                self.lookup(kind, subject).await
            }
        }
    }

    async fn lookup(&self, kind: PrincipalKind, username: &str) -> Result<Principal, AuthError> {
        self.store
            .find_by_username(kind, username)
            .await?
            .map(|account| Principal::from_account(kind, account))
            .ok_or(AuthError::PrincipalNotFound)
    }
}
