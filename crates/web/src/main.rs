use std::sync::Arc;

use anyhow::Context;

use oilstock_infra::AppConfig;
use oilstock_web::app::{self, services::AppServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    oilstock_observability::init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;

    let services = AppServices::from_config(&config).context("failed to build backend client")?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
