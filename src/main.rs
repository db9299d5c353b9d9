use std::net::SocketAddr;

use clinic::logging::init_tracing;
use clinic::metrics::{init_metrics, metrics_app};
use clinic::router::init_router;
use clinic::state::init_app_state;
use dotenvy::dotenv;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing()?;

    if let Some(handle) = init_metrics()? {
        let metrics_port = std::env::var("METRICS_PORT").unwrap_or_else(|_| "9090".to_string());
        let metrics_listener =
            tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port)).await?;
        info!(port = %metrics_port, "Metrics endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let state = init_app_state().await?;
    let bind_address = state.server_config.bind_address();
    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "🚀 Server running");
    info!("📚 OpenAPI document available at /api-docs/openapi.json");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
