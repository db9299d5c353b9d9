use std::env;
use std::fmt;

/// Shared-secret super-admin login.
///
/// - `SUPERADMIN_SECRET_KEY`: the secret; an unset or empty value disables
///   super-admin login entirely
/// - `SUPERADMIN_LOGIN_PATH`: the dedicated login path (default: `/superAdminLogin`)
#[derive(Clone, PartialEq, Eq)]
pub struct SuperAdminConfig {
    pub secret_key: Option<String>,
    pub login_path: String,
}

impl Default for SuperAdminConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            login_path: "/superAdminLogin".to_string(),
        }
    }
}

/// An empty or all-whitespace secret disables super-admin login.
fn normalize_secret(secret: String) -> Option<String> {
    let secret = secret.trim();
    (!secret.is_empty()).then(|| secret.to_string())
}

impl SuperAdminConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: env::var("SUPERADMIN_SECRET_KEY")
                .ok()
                .and_then(normalize_secret),
            login_path: env::var("SUPERADMIN_LOGIN_PATH")
                .unwrap_or_else(|_| "/superAdminLogin".to_string()),
        }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret_key: normalize_secret(secret.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for SuperAdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperAdminConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[redacted]"))
            .field("login_path", &self.login_path)
            .finish()
    }
}
