//! # Clinic Cache
//!
//! Redis-backed storage for the shared authentication state.
//!
//! This crate provides:
//! - Redis connection management ([`RedisStore`])
//! - [`RedisLockoutStore`]: per-client lockout records updated by atomic Lua scripts
//! - [`RedisRefreshLedger`]: spent refresh-token identifiers (`SET NX PX`)
//! - Configuration from environment variables and key builders
//!
//! Both stores implement the `clinic-auth` storage traits, so several API
//! instances behind a load balancer share one lockout view.
//!
//! # Example
//!
//! ```ignore
//! use clinic_cache::{CacheConfig, RedisLockoutStore, RedisStore};
//!
//! let config = CacheConfig::from_env();
//! let redis = RedisStore::connect(&config).await?;
//! let lockouts = RedisLockoutStore::new(redis.clone());
//! ```

pub mod config;
pub mod keys;
pub mod ledger;
pub mod lockout;
pub mod redis;

pub use config::CacheConfig;
pub use ledger::RedisRefreshLedger;
pub use lockout::RedisLockoutStore;
pub use redis::{CacheError, RedisStore};
