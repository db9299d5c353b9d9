//! Middleware and extractors for request authentication.
//!
//! # Authentication Flow
//!
//! 1. [`auth::authenticate_request`] runs on every request and attaches an
//!    [`Identity`](clinic_models::Identity) when the bearer header, the
//!    `token` cookie, or the super-admin key establishes one
//! 2. Handlers ask for [`auth::AuthPrincipal`] (any authenticated caller) or
//!    a role extractor such as [`auth::RequireDoctor`]
//! 3. [`auth::ClientAddr`] yields the key failed logins are counted under
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::{AuthPrincipal, RequireAdmin};
//!
//! async fn me(AuthPrincipal(identity): AuthPrincipal) -> impl IntoResponse {
//!     Json(IdentityResponse::from(identity))
//! }
//!
//! async fn admin_home(RequireAdmin(identity): RequireAdmin) -> impl IntoResponse {
//!     // Only executes for ROLE_ADMIN callers
//! }
//! ```

pub mod auth;
