use clinic_core::hash_password_with_cost;
use clinic_db::PgPrincipalStore;
use clinic_models::{Account, LoginRequest, PrincipalKind};
use uuid::Uuid;
use validator::Validate;

/// A principal that passed the same checks the login form applies.
#[derive(Debug)]
pub struct NewPrincipal {
    kind: PrincipalKind,
    username: String,
    password: String,
}

impl NewPrincipal {
    pub fn new(
        kind: PrincipalKind,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, String> {
        let request = LoginRequest {
            username: username.into(),
            password: password.into(),
        };
        request.validate().map_err(|e| e.to_string())?;

        if PrincipalKind::from_username(&request.username) != Some(kind) {
            return Err(format!(
                "A {} username must start with '{}'",
                kind,
                kind.prefix()
            ));
        }

        Ok(Self {
            kind,
            username: request.username,
            password: request.password,
        })
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub async fn create(
        &self,
        store: &PgPrincipalStore,
        bcrypt_cost: u32,
    ) -> Result<Account, Box<dyn std::error::Error>> {
        let hashed = hash_password_with_cost(&self.password, bcrypt_cost)
            .map_err(|e| format!("Failed to hash password: {}", e.error))?;

        store
            .create_account(self.kind, &self.username, &hashed)
            .await?
            .ok_or_else(|| format!("A {} named {} already exists", self.kind, self.username).into())
    }
}

/// A fresh super-admin key in the hyphenated UUID form the login form accepts.
pub fn generate_super_admin_key() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
