use clinic_models::{Identity, IdentityResponse};
use serde::Serialize;
use utoipa::ToSchema;

/// Landing payload for a role's home page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomeResponse {
    pub message: String,
    pub identity: IdentityResponse,
}

impl HomeResponse {
    pub fn welcome(identity: Identity) -> Self {
        Self {
            message: format!("Welcome, {}", identity.username),
            identity: identity.into(),
        }
    }
}
