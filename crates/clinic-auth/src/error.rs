use axum::http::StatusCode;
use clinic_core::AppError;

/// Failures produced by the authentication core.
///
/// Credential problems collapse into one generic message so a caller cannot
/// tell an unknown username from a wrong password.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("Too many failed login attempts. Try again in {retry_after_secs} seconds")]
    LockedOut { retry_after_secs: u64 },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Refresh token has already been used")]
    RefreshReused,

    #[error("Failed to create token: {0}")]
    TokenCreation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::PrincipalNotFound
            | AuthError::LockedOut { .. }
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::RefreshReused => StatusCode::UNAUTHORIZED,
            AuthError::TokenCreation(_) | AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for infrastructure failures that must not be mistaken for a
    /// rejected credential.
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Message safe to show a client.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::PrincipalNotFound => AuthError::InvalidCredentials.to_string(),
            AuthError::TokenCreation(_) | AuthError::Store(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn into_app_error(self) -> AppError {
        if self.is_internal() {
            tracing::error!(error = %self, "Authentication infrastructure failure");
            return AppError::internal_error(self.public_message());
        }

        let mut err = AppError::unauthorized(self.public_message());
        if let AuthError::LockedOut { retry_after_secs } = self {
            err = err
                .with_detail("lockout", true)
                .with_detail("retry_after_seconds", retry_after_secs)
                .with_retry_after(retry_after_secs);
        }
        err
    }
}
