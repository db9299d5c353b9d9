use axum::{Router, routing::get};

use super::controller::{admin_home, doctor_home, super_admin_home, user_home};
use crate::state::AppState;

pub fn init_home_router() -> Router<AppState> {
    Router::new()
        .route("/users/home", get(user_home))
        .route("/doctors/home", get(doctor_home))
        .route("/admins/home", get(admin_home))
        .route("/superadmins/home", get(super_admin_home))
}
