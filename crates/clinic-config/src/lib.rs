//! # Clinic Config
//!
//! Configuration types for the clinic API.
//!
//! Every structure is loaded from environment variables (after `.env` has
//! been read by the binary) and falls back to a sensible default:
//!
//! - [`jwt`]: Token signing secret and lifetimes
//! - [`lockout`]: Failed-login threshold and lockout window
//! - [`super_admin`]: Shared super-admin secret and its login path
//! - [`server`]: Bind address, session store backend and CORS origins
//!
//! # Example
//!
//! ```ignore
//! use clinic_config::{JwtConfig, LockoutConfig, SuperAdminConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let lockout_config = LockoutConfig::from_env();
//! let super_admin = SuperAdminConfig::from_env();
//! ```

pub mod jwt;
pub mod lockout;
pub mod server;
pub mod super_admin;

// Re-export commonly used types at crate root
pub use jwt::JwtConfig;
pub use lockout::LockoutConfig;
pub use server::{CorsConfig, ServerConfig, StoreBackend};
pub use super_admin::SuperAdminConfig;
