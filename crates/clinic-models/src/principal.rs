//! Principals and roles.
//!
//! A principal is any party that can authenticate: a clinic user, a doctor,
//! an admin, or the single shared-secret super admin. The first character of
//! a stored username (`U`, `D`, `A`) names the store it lives in; the super
//! admin is never looked up in a store.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Subject carried by tokens issued to the super admin.
///
/// Contains a space, so it can never collide with a stored username.
pub const SUPER_ADMIN_SUBJECT: &str = "Super Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "DOCTOR")]
    Doctor,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "SUPERADMIN")]
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Doctor, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Doctor => "DOCTOR",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPERADMIN",
        }
    }

    /// Granted-authority form carried in the token's `role` claim.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Doctor => "ROLE_DOCTOR",
            Role::Admin => "ROLE_ADMIN",
            Role::SuperAdmin => "ROLE_SUPERADMIN",
        }
    }

    /// Accepts both `ROLE_DOCTOR` and `DOCTOR`.
    pub fn from_authority(value: &str) -> Option<Role> {
        let value = value.trim();
        let bare = value.strip_prefix("ROLE_").unwrap_or(value);
        Role::ALL.into_iter().find(|role| role.as_str() == bare)
    }

    /// Landing page a client is sent to after logging in.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::User => "/api/v1/users/home",
            Role::Doctor => "/api/v1/doctors/home",
            Role::Admin => "/api/v1/admins/home",
            Role::SuperAdmin => "/api/v1/superadmins/home",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-backed principal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Doctor,
    Admin,
}

impl PrincipalKind {
    pub const ALL: [PrincipalKind; 3] =
        [PrincipalKind::User, PrincipalKind::Doctor, PrincipalKind::Admin];

    pub fn prefix(&self) -> char {
        match self {
            PrincipalKind::User => 'U',
            PrincipalKind::Doctor => 'D',
            PrincipalKind::Admin => 'A',
        }
    }

    /// Store a username belongs to, judged by its first character.
    pub fn from_username(username: &str) -> Option<PrincipalKind> {
        let first = username.chars().next()?;
        PrincipalKind::ALL
            .into_iter()
            .find(|kind| kind.prefix() == first)
    }

    pub fn role(&self) -> Role {
        match self {
            PrincipalKind::User => Role::User,
            PrincipalKind::Doctor => Role::Doctor,
            PrincipalKind::Admin => Role::Admin,
        }
    }

    pub fn from_role(role: Role) -> Option<PrincipalKind> {
        match role {
            Role::User => Some(PrincipalKind::User),
            Role::Doctor => Some(PrincipalKind::Doctor),
            Role::Admin => Some(PrincipalKind::Admin),
            Role::SuperAdmin => None,
        }
    }

    pub fn parse(value: &str) -> Option<PrincipalKind> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(PrincipalKind::User),
            "doctor" => Some(PrincipalKind::Doctor),
            "admin" => Some(PrincipalKind::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrincipalKind::User => "user",
            PrincipalKind::Doctor => "doctor",
            PrincipalKind::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// A stored account row: the same shape in the users, doctors and admins tables.
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A resolved principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(Account),
    Doctor(Account),
    Admin(Account),
    SuperAdmin,
}

impl Principal {
    pub fn from_account(kind: PrincipalKind, account: Account) -> Self {
        match kind {
            PrincipalKind::User => Principal::User(account),
            PrincipalKind::Doctor => Principal::Doctor(account),
            PrincipalKind::Admin => Principal::Admin(account),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::User(_) => Role::User,
            Principal::Doctor(_) => Role::Doctor,
            Principal::Admin(_) => Role::Admin,
            Principal::SuperAdmin => Role::SuperAdmin,
        }
    }

    /// Canonical identity placed in the token subject.
    pub fn username(&self) -> &str {
        match self {
            Principal::User(a) | Principal::Doctor(a) | Principal::Admin(a) => &a.username,
            Principal::SuperAdmin => SUPER_ADMIN_SUBJECT,
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Principal::User(a) | Principal::Doctor(a) | Principal::Admin(a) => Some(a),
            Principal::SuperAdmin => None,
        }
    }
}
