use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use petconnect_api::app::{AppOptions, AppServices, build_app};
use petconnect_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    petconnect_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(AppServices::from_config(&config).await?);
    let app = build_app(
        config.jwt_secret.expose_secret().as_bytes(),
        services,
        AppOptions::from_config(&config),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
