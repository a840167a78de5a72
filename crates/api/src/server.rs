//! HTTP server bootstrap and runtime wiring.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use scentrack_infra::AppConfig;

use crate::app::{build_app, services};

/// Serve until Ctrl-C, owning the sweep scheduler's lifecycle.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = Arc::new(
        services::build_services(&config)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?,
    );

    if config.sweep_enabled {
        services.scheduler.start();
    } else {
        info!("periodic sweep disabled");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %listener.local_addr()?, "listening");

    let served = axum::serve(listener, build_app(services.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    services.scheduler.stop().await;
    served.context("server terminated with an error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
