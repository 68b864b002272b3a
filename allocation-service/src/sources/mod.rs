pub mod inline_csv;
pub mod interval_csv;
pub mod interval_csv_file;

pub use inline_csv::InlineCsvSource;
pub use interval_csv::{parse_source, parse_str, ParseError, ParsedSource, ParserOutput};
pub use interval_csv_file::IntervalCsvFileSource;

use crate::pipeline::PipelineError;

/// Parses on the blocking pool so several sources can be parsed in parallel.
async fn parse_blocking(name: String, bytes: Vec<u8>) -> Result<ParsedSource, PipelineError> {
    tokio::task::spawn_blocking(move || ParsedSource::from_bytes(name, &bytes))
        .await
        .map_err(|e| PipelineError::Source(format!("parser task failed: {e}")))?
        .map_err(PipelineError::from)
}
