//! In-memory application state for integration tests.
//!
//! Enabled by the `test-utils` feature. Everything runs against memory stores
//! and a [`ManualClock`], so expiry and lockout windows can be crossed without
//! sleeping.

use std::sync::Arc;

use axum::Router;
use chrono::{Duration, Utc};
use clinic_auth::{MemoryLockoutStore, MemoryPrincipalStore, MemoryRefreshLedger};
use clinic_config::{CorsConfig, JwtConfig, LockoutConfig, ServerConfig, SuperAdminConfig};
use clinic_core::{ManualClock, SharedClock, hash_password_with_cost};
use clinic_models::{Account, PrincipalKind};
use uuid::Uuid;

use crate::router::init_router;
use crate::state::{AppState, StateParts};

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-integration-tests";
pub const TEST_SUPER_ADMIN_KEY: &str = "5f0c4a4e-7a1b-4c2d-9e3f-0a1b2c3d4e5f";

// Minimum bcrypt cost keeps the suite fast.
const TEST_BCRYPT_COST: u32 = 4;

pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub principals: Arc<MemoryPrincipalStore>,
    pub lockouts: Arc<MemoryLockoutStore>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::with_lockout(LockoutConfig::default())
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lockout(lockout_config: LockoutConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let shared: SharedClock = clock.clone();
        let principals = Arc::new(MemoryPrincipalStore::new());
        let lockouts = Arc::new(MemoryLockoutStore::new());

        let state = AppState::from_parts(StateParts {
            principals: principals.clone(),
            lockout_store: lockouts.clone(),
            refresh_ledger: Arc::new(MemoryRefreshLedger::new(shared.clone())),
            clock: shared,
            jwt_config: JwtConfig {
                secret: TEST_JWT_SECRET.to_string(),
                access_token_expiry: 300,
                refresh_token_expiry: 604800,
            },
            lockout_config,
            super_admin_config: SuperAdminConfig::with_secret(TEST_SUPER_ADMIN_KEY),
            cors_config: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            server_config: ServerConfig {
                bcrypt_cost: TEST_BCRYPT_COST,
                ..ServerConfig::default()
            },
        })
        .unwrap_or_else(|e| panic!("failed to build test state: {}", e.error));

        Self {
            state,
            clock,
            principals,
            lockouts,
        }
    }

    /// Stores an account whose kind follows the username prefix.
    pub fn add_account(&self, username: &str, password: &str) -> Account {
        let kind = PrincipalKind::from_username(username)
            .unwrap_or_else(|| panic!("no principal kind for username {}", username));
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password_with_cost(password, TEST_BCRYPT_COST)
                .unwrap_or_else(|e| panic!("failed to hash test password: {}", e.error)),
        };
        self.principals.insert(kind, account.clone());
        account
    }

    pub fn remove_account(&self, username: &str) {
        if let Some(kind) = PrincipalKind::from_username(username) {
            self.principals.remove(kind, username);
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn router(&self) -> Router {
        init_router(self.state.clone())
    }
}
