use std::net::SocketAddr;

use anyhow::Result;
use metering_client::AnomalyDetector;
use metering_service::{api, config::AppConfig, metrics_server, observability, storage};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let store = storage::connect(&cfg.storage).await?;
    let detector = AnomalyDetector::new(cfg.analytics.anomaly_threshold)?;
    let state = api::AppState::new(store, detector, cfg.server.max_page_size);

    let addr: SocketAddr = cfg
        .server
        .http_bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.http_bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        storage = ?cfg.storage.kind,
        anomaly_threshold = detector.threshold(),
        "metering service listening"
    );

    axum::serve(listener, api::router(state).into_make_service()).await?;

    Ok(())
}
