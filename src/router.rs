use crate::docs::openapi_json;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::auth::{REFRESH_TOKEN_HEADER, SUPER_ADMIN_KEY_HEADER, authenticate_request};
use crate::modules::auth::router::init_auth_router;
use crate::modules::home::router::init_home_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(init_auth_router(&state.super_admin_config.login_path))
        .nest("/api/v1", init_home_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ))
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    REFRESH_TOKEN_HEADER,
                    SUPER_ADMIN_KEY_HEADER,
                ])
                .expose_headers([header::AUTHORIZATION, REFRESH_TOKEN_HEADER, header::RETRY_AFTER])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
