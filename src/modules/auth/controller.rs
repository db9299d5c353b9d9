use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use clinic_auth::{TokenPair, bearer_token};
use clinic_core::AppError;
use clinic_models::{
    IdentityResponse, IdentitySource, LoginRequest, LoginResponse, LogoutResponse, Role,
    SuperAdminLoginRequest,
};
use tracing::instrument;
use utoipa::ToSchema;

use super::service::AuthService;
use crate::middleware::auth::{
    AuthPrincipal, ClientAddr, OptionalIdentity, REFRESH_COOKIE, REFRESH_TOKEN_HEADER,
    TOKEN_COOKIE,
};
use crate::state::AppState;
use crate::validator::validate_json;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}

fn with_session_cookies(jar: CookieJar, pair: &TokenPair) -> CookieJar {
    jar.add(session_cookie(TOKEN_COOKIE, pair.access_token.clone()))
        .add(session_cookie(REFRESH_COOKIE, pair.refresh_token.clone()))
}

fn login_response(state: &AppState, role: Role, pair: TokenPair) -> LoginResponse {
    LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.tokens().access_token_lifetime().num_seconds(),
        role,
        redirect: role.home_path().to_string(),
    }
}

/// Refresh token from the `RefreshToken` header, falling back to the cookie.
fn presented_refresh_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .or_else(|| {
            jar.get(REFRESH_COOKIE)
                .map(|cookie| cookie.value().to_owned())
                .filter(|value| !value.is_empty())
        })
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; session cookies set", body = LoginResponse),
        (status = 400, description = "Bad request - validation error (counts as a failed attempt)", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or client locked out", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let dto = match validate_json(payload) {
        Ok(dto) => dto,
        Err(err) => return Err(AuthService::reject_invalid_form(&state, &client, err).await),
    };

    let (role, pair) = AuthService::login(&state, &client, dto).await?;
    let jar = with_session_cookies(jar, &pair);
    Ok((jar, Json(login_response(&state, role, pair))))
}

/// Login as the super admin with the shared secret key
///
/// The key may be sent in the body or in the `X-Super-Admin-Key` header.
#[utoipa::path(
    post,
    path = "/superAdminLogin",
    request_body = SuperAdminLoginRequest,
    params(
        ("X-Super-Admin-Key" = Option<String>, Header, description = "Super-admin secret key")
    ),
    responses(
        (status = 200, description = "Login successful; session cookies set", body = LoginResponse),
        (status = 400, description = "Malformed key (counts as a failed attempt)", body = ErrorResponse),
        (status = 401, description = "Wrong key or client locked out", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, identity, jar, payload))]
pub async fn super_admin_login(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    OptionalIdentity(identity): OptionalIdentity,
    jar: CookieJar,
    payload: Result<Json<SuperAdminLoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let key_verified = identity.is_some_and(|identity| {
        identity.role == Role::SuperAdmin && identity.source == IdentitySource::SuperAdminKey
    });

    let (role, pair) =
        AuthService::super_admin_login(&state, &client, key_verified, validate_json(payload))
            .await?;
    let jar = with_session_cookies(jar, &pair);
    Ok((jar, Json(login_response(&state, role, pair))))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    params(
        ("RefreshToken" = Option<String>, Header, description = "`Bearer <refresh token>`; the refreshToken cookie is used when absent")
    ),
    responses(
        (status = 200, description = "New token pair issued", body = LoginResponse),
        (status = 401, description = "Missing, invalid, expired or already used refresh token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let refresh_token = presented_refresh_token(&headers, &jar)
        .ok_or_else(|| AppError::unauthorized("Refresh token required".to_string()))?;

    let (role, pair) = AuthService::refresh(&state, &refresh_token).await?;
    let jar = with_session_cookies(jar, &pair);
    Ok((jar, Json(login_response(&state, role, pair))))
}

/// Clear the session cookies and spend the presented refresh token
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), AppError> {
    let refresh_token = presented_refresh_token(&headers, &jar);
    AuthService::logout(&state, refresh_token.as_deref()).await?;

    let jar = jar
        .remove(Cookie::build(TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));

    Ok((
        jar,
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Get the identity established for the current request
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Authenticated identity", body = IdentityResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn me(AuthPrincipal(identity): AuthPrincipal) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(identity))
}
