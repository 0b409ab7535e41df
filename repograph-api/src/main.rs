use repograph_api::jobs::cache_gauges_task;
use repograph_api::telemetry::{init_tracing, TelemetryConfig};
use repograph_api::{build_services, ApiError, ApiResult, AppConfig, ServiceMode};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let config = AppConfig::from_env()?;
    let services = build_services(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gauges = tokio::spawn(cache_gauges_task(
        services.store.clone(),
        Some(services.writer.clone()),
        config.jobs.clone(),
        shutdown_rx.clone(),
    ));

    let addr = config.server.bind_addr()?;
    tracing::info!(%addr, mode = services.mode.as_str(), "Starting repograph");
    if services.mode == ServiceMode::Web {
        tracing::info!(graph_addr = %config.server.graph_addr, "Graph worker address");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, services.router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
                _ = server_shutdown.changed() => {}
            }
        })
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = gauges.await {
        tracing::warn!(error = %e, "Cache gauge task ended abnormally");
    }

    services.writer.flush().await;
    tracing::info!(
        writes_dropped = services.writer.dropped(),
        writes_failed = services.writer.failed(),
        "Shutdown complete"
    );

    Ok(())
}
