use std::{path::PathBuf, time::SystemTime};

use futures::Stream;

use super::interval_csv::{ParseError, ParsedSource};
use crate::pipeline::{Envelope, PipelineError, Source};

/// Reads one interval CSV export from disk and yields it parsed.
pub struct IntervalCsvFileSource {
    path: PathBuf,
}

impl IntervalCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<ParsedSource> for IntervalCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<ParsedSource>, PipelineError>> + Send>> {
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let bytes = tokio::fs::read(&path).await.map_err(|source| {
                PipelineError::from(ParseError::Io {
                    path: path.clone(),
                    source,
                })
            })?;

            let name = path.display().to_string();
            let parsed = super::parse_blocking(name, bytes).await?;
            tracing::info!(
                source = %parsed.name,
                meters = parsed.meters.len(),
                records = parsed.record_count(),
                "parsed interval CSV file"
            );

            yield Envelope {
                payload: parsed,
                received_at: SystemTime::now(),
            };
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;

    #[tokio::test]
    async fn yields_one_parsed_source_per_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CH1;1-1:1.29.0;KWH;01.08.2025;1;2;3").unwrap();
        writeln!(file, "CH2;1-1:1.29.0;KWH;01.08.2025;4").unwrap();

        let source = IntervalCsvFileSource::new(file.path());
        let items: Vec<_> = source.stream().await.collect().await;

        assert_eq!(items.len(), 1);
        let parsed = items.into_iter().next().unwrap().unwrap().payload;
        assert_eq!(parsed.meters.len(), 2);
        assert_eq!(parsed.record_count(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_a_parse_error() {
        let source = IntervalCsvFileSource::new("/definitely/not/here.csv");
        let items: Vec<_> = source.stream().await.collect().await;
        assert!(matches!(items.as_slice(), [Err(PipelineError::Parse(ParseError::Io { .. }))]));
    }
}
