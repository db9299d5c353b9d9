//! Authentication DTOs.
//!
//! Request bodies for the two login entry points, the token pair handed back
//! on success, and the identity a request carries once it has been
//! authenticated.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::principal::Role;

/// Username/password login for users, doctors and admins.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(
        length(min = 8, max = 20, message = "Username must be between 8 and 20 characters"),
        custom(function = "validate_username_charset")
    )]
    #[schema(example = "U1234567")]
    pub username: String,
    #[validate(length(min = 8, max = 255, message = "Password must be between 8 and 255 characters"))]
    #[schema(example = "Passw0rd@")]
    pub password: String,
}

/// Shared-secret login for the super admin.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SuperAdminLoginRequest {
    #[validate(custom(function = "validate_super_admin_key"))]
    #[schema(example = "5f0c4a4e-7a1b-4c2d-9e3f-0a1b2c3d4e5f")]
    pub super_admin_key: String,
}

fn validate_username_charset(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset")
            .with_message("Username may only contain letters and digits".into()))
    }
}

fn validate_super_admin_key(key: &str) -> Result<(), ValidationError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::new("super_admin_key_empty")
            .with_message("Super Admin Key cannot be empty".into()));
    }
    // Only the hyphenated 8-4-4-4-12 form is accepted.
    if key.len() != 36 || Uuid::try_parse(key).is_err() {
        return Err(ValidationError::new("super_admin_key_pattern")
            .with_message("Invalid Super Admin Key pattern".into()));
    }
    Ok(())
}

/// Successful login.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Session token lifetime in seconds.
    pub expires_in: i64,
    pub role: Role,
    /// Home page for the authenticated role.
    pub redirect: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// How a request's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    BearerToken,
    Cookie,
    SuperAdminKey,
}

/// Authenticated caller, attached to the request by the authentication middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: Role,
    pub source: IdentitySource,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IdentityResponse {
    pub username: String,
    pub role: Role,
    pub source: IdentitySource,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            username: identity.username,
            role: identity.role,
            source: identity.source,
        }
    }
}
