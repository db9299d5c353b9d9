use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{login, logout, me, refresh, super_admin_login};
use crate::state::AppState;

/// Login entry points live at the root; session endpoints under `/api/auth`.
pub fn init_auth_router(super_admin_login_path: &str) -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route(super_admin_login_path, post(super_admin_login))
        .route("/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/refresh", post(refresh))
}
