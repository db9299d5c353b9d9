use axum::Json;
use tracing::instrument;

use super::model::HomeResponse;
use crate::middleware::auth::{RequireAdmin, RequireDoctor, RequireSuperAdmin, RequireUser};
use crate::modules::auth::controller::ErrorResponse;

#[utoipa::path(
    get,
    path = "/api/v1/users/home",
    responses(
        (status = 200, description = "User home", body = HomeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requires USER role", body = ErrorResponse)
    ),
    tag = "Home",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn user_home(RequireUser(identity): RequireUser) -> Json<HomeResponse> {
    Json(HomeResponse::welcome(identity))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/home",
    responses(
        (status = 200, description = "Doctor home", body = HomeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requires DOCTOR role", body = ErrorResponse)
    ),
    tag = "Home",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn doctor_home(RequireDoctor(identity): RequireDoctor) -> Json<HomeResponse> {
    Json(HomeResponse::welcome(identity))
}

#[utoipa::path(
    get,
    path = "/api/v1/admins/home",
    responses(
        (status = 200, description = "Admin home", body = HomeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requires ADMIN role", body = ErrorResponse)
    ),
    tag = "Home",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn admin_home(RequireAdmin(identity): RequireAdmin) -> Json<HomeResponse> {
    Json(HomeResponse::welcome(identity))
}

#[utoipa::path(
    get,
    path = "/api/v1/superadmins/home",
    responses(
        (status = 200, description = "Super-admin home", body = HomeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requires SUPERADMIN role", body = ErrorResponse)
    ),
    tag = "Home",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn super_admin_home(RequireSuperAdmin(identity): RequireSuperAdmin) -> Json<HomeResponse> {
    Json(HomeResponse::welcome(identity))
}
