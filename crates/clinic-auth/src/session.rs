//! Session issuance, re-validation against the principal stores, and refresh.

use std::sync::Arc;

use clinic_models::Principal;
use tracing::{info, instrument, warn};

use crate::error::AuthError;
use crate::jwt::{TokenPair, TokenService, ValidatedToken};
use crate::ledger::RefreshTokenLedger;
use crate::resolver::PrincipalResolver;

/// Token issuance bound to principal resolution.
///
/// Every token accepted here is checked twice: once cryptographically by the
/// [`TokenService`], and once against the principal stores so that a token
/// whose subject has been removed, or whose role no longer matches, is refused.
#[derive(Debug, Clone)]
pub struct SessionManager {
    tokens: TokenService,
    resolver: PrincipalResolver,
    ledger: Arc<dyn RefreshTokenLedger>,
}

impl SessionManager {
    pub fn new(
        tokens: TokenService,
        resolver: PrincipalResolver,
        ledger: Arc<dyn RefreshTokenLedger>,
    ) -> Self {
        Self {
            tokens,
            resolver,
            ledger,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn resolver(&self) -> &PrincipalResolver {
        &self.resolver
    }

    pub fn issue(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        self.tokens.issue(principal)
    }

    /// Validates a session token and re-resolves its subject.
    pub async fn authenticate(&self, token: &str) -> Result<(Principal, ValidatedToken), AuthError> {
        let validated = self.tokens.validate(token)?;
        let principal = self
            .resolver
            .resolve_subject(validated.username(), validated.role())
            .await
            .map_err(|err| match err {
                AuthError::PrincipalNotFound => AuthError::InvalidToken,
                other => other,
            })?;
        Ok((principal, validated))
    }

    /// Spends a refresh token and mints a brand-new pair for its subject.
    ///
    /// The token's `jti` is consumed before the subject is re-resolved, so a
    /// refresh token is spent even when the principal has since vanished.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Principal, TokenPair), AuthError> {
        let validated = self.tokens.validate_refresh(refresh_token)?;

        if !self
            .ledger
            .consume(validated.jti(), validated.expires_at())
            .await?
        {
            warn!(subject = %validated.username(), "Refresh token replayed");
            return Err(AuthError::RefreshReused);
        }

        let principal = self
            .resolver
            .resolve_subject(validated.username(), validated.role())
            .await?;
        let pair = self.tokens.issue(&principal)?;

        info!(subject = %principal.username(), role = %principal.role(), "Token pair refreshed");
        Ok((principal, pair))
    }

    /// Spends a refresh token without issuing anything. Invalid tokens are ignored.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        if let Ok(validated) = self.tokens.validate_refresh(refresh_token) {
            self.ledger
                .consume(validated.jti(), validated.expires_at())
                .await?;
        }
        Ok(())
    }
}
