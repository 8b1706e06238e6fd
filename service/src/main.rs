use anyhow::Context;
use clap::Parser;
use formation_service::{router, AppState, ServiceConfig};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::parse();
    let state = AppState::from_config(&config)
        .with_context(|| format!("cannot serve without bundle {}", config.bundle.display()))?;
    let top_k = state.top_k();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(listen = %config.listen, top_k, timeout_ms = config.timeout_ms, "recommendation service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
