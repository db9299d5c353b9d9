use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use clinic_auth::{AuthError, AuthOutcome, AuthRequest, TokenPair};
use clinic_core::AppError;
use clinic_models::{Identity, Role};

use crate::metrics::{track_auth_rejection, track_token_refresh};
use crate::state::AppState;

/// Cookie holding the session token.
pub const TOKEN_COOKIE: &str = "token";
/// Cookie holding the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";
/// Header carrying `Bearer <refresh token>` on requests and refreshed responses.
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("refreshtoken");
pub const SUPER_ADMIN_KEY_HEADER: HeaderName = HeaderName::from_static("x-super-admin-key");

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn rejection_reason(err: &AuthError) -> &'static str {
    match err {
        AuthError::ExpiredToken => "expired_token",
        AuthError::RefreshReused => "refresh_reused",
        AuthError::TokenCreation(_) | AuthError::Store(_) => "internal",
        _ => "invalid_token",
    }
}

fn bearer_header(token: &str) -> Result<HeaderValue, AppError> {
    Ok(HeaderValue::from_str(&format!("Bearer {}", token))?)
}

/// Establishes the caller's [`Identity`] from the bearer header, the session
/// cookie, or the super-admin key, and stores it in the request extensions.
///
/// Only a bad bearer token rejects the request. A refreshed pair is returned
/// in the `Authorization` and `RefreshToken` response headers while the
/// current request carries on anonymously.
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.extensions().get::<Identity>().is_some() {
        return Ok(next.run(req).await);
    }

    let headers = req.headers();
    let path = req.uri().path().to_owned();
    let authorization = header_value(headers, &header::AUTHORIZATION);
    let refresh_token = header_value(headers, &REFRESH_TOKEN_HEADER);
    let super_admin_key = header_value(headers, &SUPER_ADMIN_KEY_HEADER);
    let jar = CookieJar::from_headers(headers);

    let outcome = state
        .authenticator
        .authenticate(AuthRequest {
            path: &path,
            authorization: authorization.as_deref(),
            refresh_token: refresh_token.as_deref(),
            cookie_token: jar.get(TOKEN_COOKIE).map(|cookie| cookie.value()),
            super_admin_key: super_admin_key.as_deref(),
        })
        .await;

    match outcome {
        Ok(AuthOutcome::Authenticated(identity)) => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        Ok(AuthOutcome::Refreshed(pair)) => {
            track_token_refresh(true);
            let mut response = next.run(req).await;
            attach_refreshed_pair(response.headers_mut(), &pair)?;
            Ok(response)
        }
        Ok(AuthOutcome::Anonymous) => Ok(next.run(req).await),
        Err(err) => {
            if refresh_token.is_some() && matches!(err, AuthError::RefreshReused) {
                track_token_refresh(false);
            }
            track_auth_rejection(rejection_reason(&err));
            Err(err.into_app_error())
        }
    }
}

fn attach_refreshed_pair(headers: &mut HeaderMap, pair: &TokenPair) -> Result<(), AppError> {
    headers.insert(header::AUTHORIZATION, bearer_header(&pair.access_token)?);
    headers.insert(REFRESH_TOKEN_HEADER, bearer_header(&pair.refresh_token)?);
    Ok(())
}

/// Extractor for routes that need an authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Identity);

impl AuthPrincipal {
    pub fn username(&self) -> &str {
        &self.0.username
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.0.role == role
    }
}

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthPrincipal)
            .ok_or_else(|| {
                track_auth_rejection("anonymous");
                AppError::unauthorized("Authentication required".to_string())
            })
    }
}

/// The caller's identity when one was established.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}

/// Creates an extractor that only admits callers holding exactly one role.
#[macro_export]
macro_rules! require_role {
    ($name:ident, $role:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::clinic_models::Identity);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = $crate::clinic_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let $crate::middleware::auth::AuthPrincipal(identity) =
                    <$crate::middleware::auth::AuthPrincipal as axum::extract::FromRequestParts<
                        $crate::state::AppState,
                    >>::from_request_parts(parts, state)
                    .await?;

                let allowed = identity.role == $role;
                $crate::metrics::track_authorization_check(allowed, identity.role.as_str());

                if !allowed {
                    return Err($crate::clinic_core::AppError::forbidden(format!(
                        "Access denied. Requires role: {}",
                        $role
                    )));
                }

                Ok($name(identity))
            }
        }
    };
}

require_role!(RequireUser, Role::User);
require_role!(RequireDoctor, Role::Doctor);
require_role!(RequireAdmin, Role::Admin);
require_role!(RequireSuperAdmin, Role::SuperAdmin);

/// Lockout key for the calling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// The first `X-Forwarded-For` entry when proxies are trusted, otherwise the
/// socket peer address.
pub fn client_key(parts: &Parts, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientAddr(client_key(
            parts,
            state.lockout_config.trust_forwarded_for,
        )))
    }
}
