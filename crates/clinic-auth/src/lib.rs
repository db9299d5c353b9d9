//! # Clinic Auth
//!
//! Token-based authentication and login lockout for the clinic API.
//!
//! This crate provides:
//!
//! - [`claims`]: The typed claim set carried by session and refresh tokens
//! - [`jwt`]: Issuing and validating HS256 tokens ([`TokenService`])
//! - [`ledger`]: Single-use bookkeeping for refresh tokens
//! - [`resolver`]: Mapping a username or token subject to a [`Principal`](clinic_models::Principal)
//! - [`lockout`]: Per-client failed-login counting and time-boxed lockout
//! - [`session`]: Login token issuance and the refresh protocol
//! - [`authenticator`]: The per-request bearer/cookie/super-admin decision
//! - [`error`]: [`AuthError`] and its HTTP mapping
//!
//! # Token Types
//!
//! - **Session token**: short-lived (5 minutes by default), presented as
//!   `Authorization: Bearer <token>` or in the `token` cookie
//! - **Refresh token**: long-lived, single use, presented as
//!   `RefreshToken: Bearer <token>` or in the `refreshToken` cookie
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clinic_auth::{MemoryPrincipalStore, MemoryRefreshLedger, PrincipalResolver, SessionManager, TokenService};
//! use clinic_config::{JwtConfig, SuperAdminConfig};
//! use clinic_core::SystemClock;
//!
//! let clock = Arc::new(SystemClock);
//! let tokens = TokenService::new(JwtConfig::from_env(), clock.clone());
//! let resolver = PrincipalResolver::new(Arc::new(MemoryPrincipalStore::new()), &SuperAdminConfig::from_env());
//! let sessions = SessionManager::new(tokens, resolver, Arc::new(MemoryRefreshLedger::new(clock)));
//!
//! let principal = sessions.resolver().resolve("U1234567").await?;
//! let pair = sessions.issue(&principal)?;
//! ```

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod jwt;
pub mod ledger;
pub mod lockout;
pub mod resolver;
pub mod session;

// Re-export commonly used types at crate root
pub use authenticator::{AuthOutcome, AuthRequest, RequestAuthenticator, bearer_token};
pub use claims::{SessionClaims, TokenKind};
pub use error::AuthError;
pub use jwt::{TokenError, TokenPair, TokenService, ValidatedToken};
pub use ledger::{MemoryRefreshLedger, RefreshTokenLedger};
pub use lockout::{
    LockoutPolicy, LockoutRecord, LockoutStatus, LockoutStore, LockoutTracker,
    MemoryLockoutStore, RecordedFailure,
};
pub use resolver::{MemoryPrincipalStore, PrincipalResolver, PrincipalStore};
pub use session::SessionManager;
