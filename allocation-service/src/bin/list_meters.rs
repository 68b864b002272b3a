use anyhow::{bail, Result};
use allocation_service::{merge, observability, pipeline, sources::IntervalCsvFileSource};
use meter_client::series;
use std::env;

/// Prints every meter found in the given interval CSV exports with its date
/// range, so the right meters can be put into the configuration.
///
/// Usage:
///   list_meters <csv_file_path>...
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: list_meters <csv_file_path>...");
    }

    let sources: Vec<IntervalCsvFileSource> = paths.iter().map(IntervalCsvFileSource::new).collect();
    let parsed = pipeline::gather(&sources).await?;
    let merged = merge::merge_sources(parsed.into_iter().map(|s| s.meters));

    for summary in series::list_meters(&merged) {
        let range = match (summary.first_date, summary.last_date) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "no data".to_string(),
        };
        println!(
            "{}\t{} days\t{}\t{:.3} kWh",
            summary.identity, summary.days, range, summary.total_kwh
        );
        if !summary.duplicate_dates.is_empty() {
            println!("  {} dates with more than one record", summary.duplicate_dates.len());
        }
    }

    Ok(())
}
