use std::sync::Arc;
use std::time::Duration;

use clinic_auth::{
    LockoutPolicy, LockoutStore, LockoutTracker, MemoryLockoutStore, MemoryRefreshLedger,
    PrincipalResolver, PrincipalStore, RefreshTokenLedger, RequestAuthenticator, SessionManager,
    TokenService,
};
use clinic_cache::{CacheConfig, RedisLockoutStore, RedisRefreshLedger, RedisStore};
use clinic_config::{
    CorsConfig, JwtConfig, LockoutConfig, ServerConfig, StoreBackend, SuperAdminConfig,
};
use clinic_core::{AppError, SharedClock, SystemClock, hash_password_with_cost};
use clinic_db::{PgPrincipalStore, init_db_pool, run_migrations};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub lockout: LockoutTracker,
    pub authenticator: RequestAuthenticator,
    pub clock: SharedClock,
    pub jwt_config: JwtConfig,
    pub lockout_config: LockoutConfig,
    pub super_admin_config: SuperAdminConfig,
    pub cors_config: CorsConfig,
    pub server_config: ServerConfig,
    /// Verified against when a login names no account, so unknown usernames
    /// cost the same bcrypt work as known ones.
    pub dummy_password_hash: Arc<str>,
}

/// Value hashed into [`AppState::dummy_password_hash`]; never a real password.
const DUMMY_PASSWORD: &str = "clinic-unknown-principal";

/// Everything [`AppState`] is assembled from. Tests build one with in-memory
/// stores and a manual clock.
#[derive(Debug)]
pub struct StateParts {
    pub principals: Arc<dyn PrincipalStore>,
    pub lockout_store: Arc<dyn LockoutStore>,
    pub refresh_ledger: Arc<dyn RefreshTokenLedger>,
    pub clock: SharedClock,
    pub jwt_config: JwtConfig,
    pub lockout_config: LockoutConfig,
    pub super_admin_config: SuperAdminConfig,
    pub cors_config: CorsConfig,
    pub server_config: ServerConfig,
}

impl AppState {
    pub fn from_parts(parts: StateParts) -> Result<Self, AppError> {
        let dummy_password_hash =
            hash_password_with_cost(DUMMY_PASSWORD, parts.server_config.bcrypt_cost)?;

        let tokens = TokenService::new(parts.jwt_config.clone(), parts.clock.clone());
        let resolver = PrincipalResolver::new(parts.principals, &parts.super_admin_config);
        let sessions = Arc::new(SessionManager::new(tokens, resolver, parts.refresh_ledger));
        let authenticator =
            RequestAuthenticator::new(sessions.clone(), parts.super_admin_config.login_path.clone());
        let lockout = LockoutTracker::new(
            parts.lockout_store,
            LockoutPolicy::from(&parts.lockout_config),
            parts.clock.clone(),
        );

        Ok(Self {
            sessions,
            lockout,
            authenticator,
            clock: parts.clock,
            jwt_config: parts.jwt_config,
            lockout_config: parts.lockout_config,
            super_admin_config: parts.super_admin_config,
            cors_config: parts.cors_config,
            server_config: parts.server_config,
            dummy_password_hash: dummy_password_hash.into(),
        })
    }
}

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory stores never expire entries on their own.
fn spawn_memory_purge(
    lockouts: Arc<MemoryLockoutStore>,
    ledger: Arc<MemoryRefreshLedger>,
    policy: LockoutPolicy,
    clock: SharedClock,
) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(PURGE_INTERVAL).await;
            lockouts.purge_stale(clock.now(), &policy);
            ledger.purge_expired();
        }
    });
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let clock: SharedClock = Arc::new(SystemClock);
    let jwt_config = JwtConfig::from_env();
    let lockout_config = LockoutConfig::from_env();
    let super_admin_config = SuperAdminConfig::from_env();
    let server_config = ServerConfig::from_env();

    if super_admin_config.secret_key.is_none() {
        warn!("SUPERADMIN_SECRET_KEY is not set; super-admin login is disabled");
    }

    let pool = init_db_pool().await?;
    run_migrations(&pool).await?;
    let principals = Arc::new(PgPrincipalStore::new(pool));

    let (lockout_store, refresh_ledger): (Arc<dyn LockoutStore>, Arc<dyn RefreshTokenLedger>) =
        match server_config.store {
            StoreBackend::Memory => {
                let lockouts = Arc::new(MemoryLockoutStore::new());
                let ledger = Arc::new(MemoryRefreshLedger::new(clock.clone()));
                spawn_memory_purge(
                    lockouts.clone(),
                    ledger.clone(),
                    LockoutPolicy::from(&lockout_config),
                    clock.clone(),
                );
                info!("Using in-memory lockout and refresh stores");
                (lockouts, ledger)
            }
            StoreBackend::Redis => {
                let redis = RedisStore::connect(&CacheConfig::from_env()).await?;
                redis.ping().await?;
                info!("Using Redis lockout and refresh stores");
                (
                    Arc::new(RedisLockoutStore::new(redis.clone())),
                    Arc::new(RedisRefreshLedger::new(redis, clock.clone())),
                )
            }
        };

    let state = AppState::from_parts(StateParts {
        principals,
        lockout_store,
        refresh_ledger,
        clock,
        jwt_config,
        lockout_config,
        super_admin_config,
        cors_config: CorsConfig::from_env(),
        server_config,
    })
    .map_err(|e| e.error)?;

    Ok(state)
}
