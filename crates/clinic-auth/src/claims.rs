//! Claim set carried by every token.
//!
//! Session and refresh tokens share one shape and are told apart by `typ`.
//! The `role` claim travels as a granted-authority string (`ROLE_DOCTOR`);
//! a comma-joined list is accepted on the way in as long as it names exactly
//! one role.

use clinic_models::Role;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Canonical principal identity (the username, or the fixed super-admin subject)
    pub sub: String,
    #[serde(serialize_with = "serialize_role", deserialize_with = "deserialize_role")]
    pub role: Role,
    /// Issued-at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds)
    pub exp: i64,
    /// Unique token identifier
    pub jti: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
}

fn serialize_role<S>(role: &Role, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(role.authority())
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_role_claim(&raw)
        .ok_or_else(|| de::Error::custom(format!("unrecognised role claim: {raw}")))
}

/// Parses a possibly comma-joined authority list into a single role.
pub fn parse_role_claim(raw: &str) -> Option<Role> {
    let mut found: Option<Role> = None;
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let role = Role::from_authority(part)?;
        match found {
            Some(existing) if existing != role => return None,
            _ => found = Some(role),
        }
    }
    found
}
