//! # Clinic Models
//!
//! Domain models and DTOs for the clinic API.
//!
//! # Modules
//!
//! - [`principal`]: Roles, principal kinds and the resolved [`Principal`] union
//! - [`auth`]: Login request/response DTOs and the request [`Identity`]
//!
//! # Example
//!
//! ```ignore
//! use clinic_models::{PrincipalKind, Role};
//!
//! let kind = PrincipalKind::from_username("D7654321");
//! assert_eq!(kind.map(|k| k.role()), Some(Role::Doctor));
//! ```

pub mod auth;
pub mod principal;

// Re-export commonly used types at crate root for convenience
pub use auth::{
    Identity, IdentityResponse, IdentitySource, LoginRequest, LoginResponse, LogoutResponse,
    SuperAdminLoginRequest,
};
pub use principal::{Account, Principal, PrincipalKind, Role, SUPER_ADMIN_SUBJECT};
