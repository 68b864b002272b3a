use anyhow::{anyhow, bail, Result};
use allocation_service::{
    allocation::AllocationEngine,
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sources::IntervalCsvFileSource,
    transform::DuplicateResolution,
};
use std::{env, sync::Arc};

/// One-shot allocation over interval CSV exports, using the tariff, meters
/// and report settings from the configuration file.
///
/// Usage:
///   allocate_files <csv_file_path>...
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: allocate_files <csv_file_path>...");
    }

    // Load configuration (ALLOCATION_CONFIG can point to a run-specific file).
    let cfg = AppConfig::load()?;

    let selection = cfg
        .meters
        .clone()
        .ok_or_else(|| anyhow!("[meters] must name the production, owner and neighbor meters"))?;
    let engine = AllocationEngine::new(cfg.tariff.as_ref(), cfg.allocation.topology)?;

    let pipeline = Pipeline {
        sources: paths.iter().map(IntervalCsvFileSource::new).collect(),
        transforms: vec![Arc::new(DuplicateResolution::new(cfg.allocation.duplicate_dates))],
        selection,
        engine,
        sink: cfg.report.sink(),
    };

    pipeline.run().await?;

    Ok(())
}
