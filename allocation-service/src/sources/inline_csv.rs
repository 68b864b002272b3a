use std::time::SystemTime;

use futures::Stream;

use super::interval_csv::ParsedSource;
use crate::pipeline::{Envelope, PipelineError, Source};

/// Interval CSV text that is already in memory, e.g. an uploaded file body.
pub struct InlineCsvSource {
    name: String,
    text: String,
}

impl InlineCsvSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[async_trait::async_trait]
impl Source<ParsedSource> for InlineCsvSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<ParsedSource>, PipelineError>> + Send>> {
        let name = self.name.clone();
        let bytes = self.text.clone().into_bytes();
        let s = async_stream::try_stream! {
            let parsed = super::parse_blocking(name, bytes).await?;
            yield Envelope {
                payload: parsed,
                received_at: SystemTime::now(),
            };
        };

        Box::pin(s)
    }
}
