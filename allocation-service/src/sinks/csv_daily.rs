use futures::StreamExt;
use meter_client::domain::{AllocationResult, EnergyFlows};

use super::ReportTarget;
use crate::pipeline::{AllocationReport, Envelope, PipelineError, Sink};

const HEADER: [&str; 13] = [
    "date",
    "production",
    "owner_usage",
    "neighbor_usage",
    "self_consumed",
    "sold_to_neighbor",
    "sold_to_grid",
    "bought_from_grid_owner",
    "bought_from_grid_neighbor",
    "revenue",
    "savings",
    "cost_owner",
    "cost_neighbor",
];

/// Writes one `;`-separated row per day, then a `total` row.
pub struct CsvDailySink {
    target: ReportTarget,
}

impl CsvDailySink {
    pub fn new(target: ReportTarget) -> Self {
        Self { target }
    }
}

fn row(label: String, e: &EnergyFlows, money: [f64; 4]) -> Vec<String> {
    let mut out = vec![label];
    out.extend(
        [
            e.production,
            e.owner_usage,
            e.neighbor_usage,
            e.self_consumed,
            e.sold_to_neighbor,
            e.sold_to_grid,
            e.bought_from_grid_owner,
            e.bought_from_grid_neighbor,
        ]
        .into_iter()
        .chain(money)
        .map(|v| v.to_string()),
    );
    out
}

pub fn encode_daily_csv(result: &AllocationResult) -> Result<Vec<u8>, PipelineError> {
    let sink_err = |e: csv::Error| PipelineError::Sink(format!("failed to encode daily CSV: {e}"));

    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    wtr.write_record(HEADER).map_err(sink_err)?;

    for day in &result.daily {
        let money = [day.revenue, day.savings, day.cost_owner, day.cost_neighbor];
        wtr.write_record(row(day.date.to_string(), &day.energy, money))
            .map_err(sink_err)?;
    }

    let t = &result.totals;
    let money = [t.revenue, t.savings, t.cost_owner, t.cost_neighbor];
    wtr.write_record(row("total".to_string(), &t.energy, money))
        .map_err(sink_err)?;

    wtr.into_inner()
        .map_err(|e| PipelineError::Sink(format!("failed to flush daily CSV: {e}")))
}

#[async_trait::async_trait]
impl Sink<AllocationReport> for CsvDailySink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<AllocationReport>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = item?;
            let bytes = encode_daily_csv(&env.payload.result)?;
            self.target.write(&bytes).await?;
            metrics::counter!("reports_written_total", "format" => "csv").increment(1);
        }
        Ok(())
    }
}
