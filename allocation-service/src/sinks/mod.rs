pub mod csv_daily;
pub mod json_report;

pub use csv_daily::CsvDailySink;
pub use json_report::JsonReportSink;

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::pipeline::{AllocationReport, Envelope, PipelineError, Sink};

/// Where a report sink writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Stdout,
    File(PathBuf),
}

impl ReportTarget {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Stdout, Self::File)
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        match self {
            Self::Stdout => {
                let mut out = tokio::io::stdout();
                out.write_all(bytes)
                    .await
                    .map_err(|e| PipelineError::Sink(format!("failed to write report to stdout: {e}")))?;
                out.flush()
                    .await
                    .map_err(|e| PipelineError::Sink(format!("failed to flush stdout: {e}")))
            }
            Self::File(path) => tokio::fs::write(path, bytes).await.map_err(|e| {
                PipelineError::Sink(format!("failed to write report to {}: {e}", path.display()))
            }),
        }
    }
}

pub enum ReportSink {
    Json(JsonReportSink),
    Csv(CsvDailySink),
}

#[async_trait::async_trait]
impl Sink<AllocationReport> for ReportSink {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<AllocationReport>, PipelineError>> + Send + Unpin + 'static,
    {
        match self {
            Self::Json(s) => s.run(input).await,
            Self::Csv(s) => s.run(input).await,
        }
    }
}
