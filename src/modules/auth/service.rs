use clinic_auth::{AuthError, LockoutStatus, TokenPair};
use clinic_core::{AppError, verify_password};
use clinic_models::{LoginRequest, Principal, Role, SuperAdminLoginRequest};
use tracing::{info, instrument, warn};

use crate::metrics::{
    track_lockout_engaged, track_login_failure, track_login_success, track_token_refresh,
    track_tokens_issued,
};
use crate::state::AppState;

pub struct AuthService;

/// Adds the attempt counter, and the countdown once the client is locked out.
fn with_lockout_details(err: AppError, status: &LockoutStatus) -> AppError {
    let err = err.with_detail("remaining_attempts", status.remaining_attempts);
    match status.retry_after_secs().filter(|_| status.locked) {
        Some(secs) => err
            .with_detail("lockout", true)
            .with_detail("retry_after_seconds", secs)
            .with_retry_after(secs),
        None => err,
    }
}

impl AuthService {
    /// Counts a failed attempt for `client` and decorates `err` with the
    /// resulting lockout state.
    async fn record_failure(
        state: &AppState,
        client: &str,
        err: AppError,
        reason: &'static str,
    ) -> AppError {
        track_login_failure(reason);
        match state.lockout.record_failure(client).await {
            Ok(status) => {
                if status.engaged {
                    track_lockout_engaged();
                }
                with_lockout_details(err, &status)
            }
            Err(store_err) => store_err.into_app_error(),
        }
    }

    async fn ensure_not_locked(state: &AppState, client: &str) -> Result<(), AppError> {
        state.lockout.ensure_not_locked(client).await.map_err(|err| {
            if matches!(err, AuthError::LockedOut { .. }) {
                track_login_failure("locked_out");
            }
            err.into_app_error()
        })
    }

    async fn complete_login(
        state: &AppState,
        client: &str,
        principal: &Principal,
    ) -> Result<(Role, TokenPair), AppError> {
        state
            .lockout
            .record_success(client)
            .await
            .map_err(AuthError::into_app_error)?;

        let pair = state
            .sessions
            .issue(principal)
            .map_err(AuthError::into_app_error)?;

        let role = principal.role();
        track_login_success(role.as_str());
        track_tokens_issued(role.as_str());
        info!(username = %principal.username(), role = %role, "Login succeeded");

        Ok((role, pair))
    }

    /// A login form that failed to parse or validate still counts against the
    /// client, unless the client is already locked out.
    #[instrument(skip(state, err))]
    pub async fn reject_invalid_form(state: &AppState, client: &str, err: AppError) -> AppError {
        if let Err(locked) = Self::ensure_not_locked(state, client).await {
            return locked;
        }
        Self::record_failure(state, client, err, "validation").await
    }

    #[instrument(skip(state, dto), fields(username = %dto.username))]
    pub async fn login(
        state: &AppState,
        client: &str,
        dto: LoginRequest,
    ) -> Result<(Role, TokenPair), AppError> {
        Self::ensure_not_locked(state, client).await?;

        // The super admin has no password and never logs in here.
        let principal = match state.sessions.resolver().resolve(&dto.username).await {
            Ok(Principal::SuperAdmin) | Err(AuthError::PrincipalNotFound) => None,
            Ok(principal) => Some(principal),
            Err(err) => return Err(err.into_app_error()),
        };

        let verified = match principal.as_ref().and_then(Principal::account) {
            Some(account) => verify_password(&dto.password, &account.password_hash)?,
            None => {
                // Same bcrypt work as a real account; the result is irrelevant.
                let _ = verify_password(&dto.password, &state.dummy_password_hash);
                false
            }
        };

        let Some(principal) = principal.filter(|_| verified) else {
            warn!(client = %client, "Login failed");
            return Err(Self::record_failure(
                state,
                client,
                AuthError::InvalidCredentials.into_app_error(),
                "invalid_credentials",
            )
            .await);
        };

        Self::complete_login(state, client, &principal).await
    }

    /// Super-admin login, either already proven by the key header (`key_verified`)
    /// or by the key in the request body.
    #[instrument(skip(state, payload))]
    pub async fn super_admin_login(
        state: &AppState,
        client: &str,
        key_verified: bool,
        payload: Result<SuperAdminLoginRequest, AppError>,
    ) -> Result<(Role, TokenPair), AppError> {
        Self::ensure_not_locked(state, client).await?;

        if !key_verified {
            let dto = match payload {
                Ok(dto) => dto,
                Err(err) => return Err(Self::record_failure(state, client, err, "validation").await),
            };

            if !state
                .sessions
                .resolver()
                .is_super_admin_secret(dto.super_admin_key.trim())
            {
                warn!(client = %client, "Super-admin login failed");
                return Err(Self::record_failure(
                    state,
                    client,
                    AuthError::InvalidCredentials.into_app_error(),
                    "invalid_super_admin_key",
                )
                .await);
            }
        }

        Self::complete_login(state, client, &Principal::SuperAdmin).await
    }

    #[instrument(skip_all)]
    pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<(Role, TokenPair), AppError> {
        match state.sessions.refresh(refresh_token).await {
            Ok((principal, pair)) => {
                track_token_refresh(true);
                track_tokens_issued(principal.role().as_str());
                Ok((principal.role(), pair))
            }
            Err(err) => {
                track_token_refresh(false);
                Err(err.into_app_error())
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> Result<(), AppError> {
        if let Some(token) = refresh_token {
            state
                .sessions
                .revoke(token)
                .await
                .map_err(AuthError::into_app_error)?;
        }
        Ok(())
    }
}
