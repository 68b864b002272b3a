use allocation_service::{
    api::{self, ApiState},
    config::AppConfig,
    metrics_server, observability,
};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    if cfg.tariff.is_none() {
        tracing::warn!("no [tariff] configured; every /allocate request must carry its own");
    }

    let state = ApiState {
        tariff: cfg.tariff,
        allocation: cfg.allocation.clone(),
    };

    api::serve(&cfg.server, state).await
}
