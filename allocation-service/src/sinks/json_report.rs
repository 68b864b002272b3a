use futures::StreamExt;

use super::ReportTarget;
use crate::pipeline::{AllocationReport, Envelope, PipelineError, Sink};

/// Writes each report as pretty-printed JSON.
pub struct JsonReportSink {
    target: ReportTarget,
}

impl JsonReportSink {
    pub fn new(target: ReportTarget) -> Self {
        Self { target }
    }
}

pub fn encode_report(report: &AllocationReport) -> Result<Vec<u8>, PipelineError> {
    let mut bytes = serde_json::to_vec_pretty(report)
        .map_err(|e| PipelineError::Sink(format!("failed to encode report as JSON: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[async_trait::async_trait]
impl Sink<AllocationReport> for JsonReportSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<AllocationReport>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = item?;
            let bytes = encode_report(&env.payload)?;
            self.target.write(&bytes).await?;
            metrics::counter!("reports_written_total", "format" => "json").increment(1);
        }
        Ok(())
    }
}
