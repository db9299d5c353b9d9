use async_trait::async_trait;
use clinic_auth::{AuthError, PrincipalStore};
use clinic_models::{Account, PrincipalKind};
use sqlx::PgPool;
use tracing::{error, instrument};
use uuid::Uuid;

/// Principal lookups against the `users`, `doctors` and `admins` tables.
#[derive(Debug, Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

fn table(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::User => "users",
        PrincipalKind::Doctor => "doctors",
        PrincipalKind::Admin => "admins",
    }
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a new account. Returns `None` when the username is taken.
    #[instrument(skip(self, password_hash))]
    pub async fn create_account(
        &self,
        kind: PrincipalKind,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (id, username, password_hash)
             VALUES ($1, $2, $3)
             ON CONFLICT (username) DO NOTHING
             RETURNING id, username, password_hash",
            table(kind)
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    #[instrument(skip(self), fields(db.table = table(kind)))]
    async fn find_by_username(
        &self,
        kind: PrincipalKind,
        username: &str,
    ) -> Result<Option<Account>, AuthError> {
        let query = format!(
            "SELECT id, username, password_hash FROM {} WHERE username = $1",
            table(kind)
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Principal lookup failed");
                AuthError::Store(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_has_its_own_table() {
        assert_eq!(table(PrincipalKind::User), "users");
        assert_eq!(table(PrincipalKind::Doctor), "doctors");
        assert_eq!(table(PrincipalKind::Admin), "admins");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_create_and_find_account() {
        let pool = crate::init_db_pool().await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        let store = PgPrincipalStore::new(pool);

        let username = format!("D{}", &Uuid::new_v4().simple().to_string()[..7]);
        let created = store
            .create_account(PrincipalKind::Doctor, &username, "$2b$04$hash")
            .await
            .unwrap()
            .unwrap();

        let found = store
            .find_by_username(PrincipalKind::Doctor, &username)
            .await
            .unwrap();
        assert_eq!(found, Some(created));

        let in_users = store
            .find_by_username(PrincipalKind::User, &username)
            .await
            .unwrap();
        assert!(in_users.is_none());
    }
}
