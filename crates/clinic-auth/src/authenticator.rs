//! Per-request authentication decision.
//!
//! The HTTP layer collects the raw credentials a request carries into an
//! [`AuthRequest`] and hands it to [`RequestAuthenticator::authenticate`],
//! which decides in this order:
//!
//! 1. `Authorization: Bearer` present: a valid token authenticates; an expired
//!    one paired with `RefreshToken: Bearer` mints a new pair and leaves the
//!    request anonymous; anything else is rejected.
//! 2. Otherwise a `token` cookie authenticates when valid and is ignored when not.
//! 3. Otherwise, on the super-admin login path, a matching key authenticates
//!    as the super admin.
//!
//! Only step 1 ever rejects a request.

use std::sync::Arc;

use clinic_models::{Identity, IdentitySource, Principal};
use tracing::debug;

use crate::error::AuthError;
use crate::jwt::TokenPair;
use crate::session::SessionManager;

/// Raw credentials pulled off a request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub path: &'a str,
    /// Full `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Full `RefreshToken` header value.
    pub refresh_token: Option<&'a str>,
    /// Value of the `token` cookie.
    pub cookie_token: Option<&'a str>,
    /// Value of the super-admin key header.
    pub super_admin_key: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(Identity),
    /// An expired session was refreshed; the caller must retry with the new pair.
    Refreshed(TokenPair),
    Anonymous,
}

/// Token from a `Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn identity(principal: &Principal, source: IdentitySource) -> Identity {
    Identity {
        username: principal.username().to_string(),
        role: principal.role(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    sessions: Arc<SessionManager>,
    super_admin_login_path: String,
}

impl RequestAuthenticator {
    pub fn new(sessions: Arc<SessionManager>, super_admin_login_path: impl Into<String>) -> Self {
        Self {
            sessions,
            super_admin_login_path: super_admin_login_path.into(),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn authenticate(&self, request: AuthRequest<'_>) -> Result<AuthOutcome, AuthError> {
        if let Some(token) = request.authorization.and_then(bearer_token) {
            return self
                .authenticate_bearer(token, request.refresh_token.and_then(bearer_token))
                .await;
        }

        if let Some(token) = request.cookie_token.filter(|t| !t.is_empty()) {
            match self.sessions.authenticate(token).await {
                Ok((principal, _)) => {
                    return Ok(AuthOutcome::Authenticated(identity(
                        &principal,
                        IdentitySource::Cookie,
                    )));
                }
                Err(err) if err.is_internal() => return Err(err),
                Err(err) => debug!(error = %err, "Ignoring unusable session cookie"),
            }
        }

        if request.path == self.super_admin_login_path {
            if let Some(key) = request.super_admin_key {
                if self.sessions.resolver().is_super_admin_secret(key.trim()) {
                    return Ok(AuthOutcome::Authenticated(identity(
                        &Principal::SuperAdmin,
                        IdentitySource::SuperAdminKey,
                    )));
                }
            }
        }

        Ok(AuthOutcome::Anonymous)
    }

    async fn authenticate_bearer(
        &self,
        token: &str,
        refresh_token: Option<&str>,
    ) -> Result<AuthOutcome, AuthError> {
        match self.sessions.authenticate(token).await {
            Ok((principal, _)) => Ok(AuthOutcome::Authenticated(identity(
                &principal,
                IdentitySource::BearerToken,
            ))),
            Err(AuthError::ExpiredToken) => match refresh_token {
                Some(refresh_token) => {
                    let (_, pair) = self.sessions.refresh(refresh_token).await?;
                    Ok(AuthOutcome::Refreshed(pair))
                }
                None => Err(AuthError::ExpiredToken),
            },
            Err(err) => Err(err),
        }
    }
}
