//! Issuing and validating signed tokens.
//!
//! Tokens are compact JWS strings signed with HMAC-SHA256 over the server
//! secret. Expiry is checked here against the injected clock rather than by
//! the decoder, so a token with a good signature that has run out of time is
//! reported as [`TokenError::Expired`] while anything tampered with or
//! malformed is [`TokenError::Invalid`].
//!
//! # Example
//!
//! ```ignore
//! let tokens = TokenService::new(JwtConfig::from_env(), Arc::new(SystemClock));
//! let pair = tokens.issue(&principal)?;
//!
//! let validated = tokens.validate(&pair.access_token)?;
//! assert_eq!(validated.username(), principal.username());
//! ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use clinic_config::JwtConfig;
use clinic_core::SharedClock;
use clinic_models::{Principal, Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::claims::{SessionClaims, TokenKind};
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed payload, or the wrong kind of token.
    #[error("invalid token")]
    Invalid,
    /// Signature checks out but the token is past its expiry.
    #[error("expired token")]
    Expired,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Expired => AuthError::ExpiredToken,
        }
    }
}

/// Claims that passed signature and expiry checks.
///
/// Only [`TokenService`] can construct one, so holding a `ValidatedToken` is
/// proof the projections below are safe to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    claims: SessionClaims,
}

impl ValidatedToken {
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn kind(&self) -> TokenKind {
        self.claims.kind
    }

    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.iat, 0).unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_default()
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}

/// A freshly minted session/refresh pair.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct TokenService {
    config: JwtConfig,
    clock: SharedClock,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: JwtConfig, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the injected clock in `decode_kind`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
            clock,
            validation,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn access_token_lifetime(&self) -> Duration {
        Duration::seconds(self.config.access_token_expiry)
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::seconds(self.config.refresh_token_expiry)
    }

    /// Issues a session token and its paired refresh token for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        self.issue_for(principal.username(), principal.role())
    }

    pub fn issue_for(&self, subject: &str, role: Role) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let access_expires_at = now + self.access_token_lifetime();
        let refresh_expires_at = now + self.refresh_token_lifetime();

        let access_token = self.sign(subject, role, now, access_expires_at, TokenKind::Access)?;
        let refresh_token =
            self.sign(subject, role, now, refresh_expires_at, TokenKind::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Validates a session token.
    pub fn validate(&self, token: &str) -> Result<ValidatedToken, TokenError> {
        self.decode_kind(token, TokenKind::Access)
    }

    /// Validates a refresh token against its own expiry.
    pub fn validate_refresh(&self, token: &str) -> Result<ValidatedToken, TokenError> {
        self.decode_kind(token, TokenKind::Refresh)
    }

    fn sign(
        &self,
        subject: &str,
        role: Role,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        kind: TokenKind,
    ) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<ValidatedToken, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                TokenError::Invalid
            })?;

        let claims = data.claims;
        if claims.kind != expected {
            return Err(TokenError::Invalid);
        }

        if self.clock.now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(ValidatedToken { claims })
    }
}
