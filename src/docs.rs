use axum::Json;
use clinic_models::{
    IdentityResponse, IdentitySource, LoginRequest, LoginResponse, LogoutResponse, Role,
    SuperAdminLoginRequest,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;
use crate::modules::home::model::HomeResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::super_admin_login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::me,
        crate::modules::home::controller::user_home,
        crate::modules::home::controller::doctor_home,
        crate::modules::home::controller::admin_home,
        crate::modules::home::controller::super_admin_home,
    ),
    components(
        schemas(
            LoginRequest,
            SuperAdminLoginRequest,
            LoginResponse,
            LogoutResponse,
            IdentityResponse,
            IdentitySource,
            Role,
            HomeResponse,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, logout and token refresh"),
        (name = "Home", description = "Role landing pages")
    ),
    info(
        title = "Clinic API",
        version = "0.1.0",
        description = "Token-based authentication with per-client login lockout for the clinic backend.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

/// Serves the OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
