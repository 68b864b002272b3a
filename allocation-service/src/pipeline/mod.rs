use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use meter_client::domain::{
    AllocationResult, ConfigurationError, DuplicateDateError, MeterIdentity, MeterSeries,
    MeterTopology, TariffConfig,
};

use crate::allocation::{AllocationEngine, NeighborBill};
use crate::merge::{self, MergedSeries};
use crate::sources::{ParseError, ParsedSource};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("meter {meter}: {source}")]
    DuplicateDate {
        meter: MeterIdentity,
        #[source]
        source: DuplicateDateError,
    },
    #[error("no data for meter {0}")]
    MeterNotFound(MeterIdentity),
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

/// The three meters an allocation reads.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MeterSelection {
    pub production: MeterIdentity,
    pub owner: MeterIdentity,
    pub neighbor: MeterIdentity,
}

impl MeterSelection {
    pub fn select<'a>(
        &self,
        merged: &'a MergedSeries,
    ) -> Result<[&'a MeterSeries; 3], PipelineError> {
        let get = |meter: &MeterIdentity| {
            merged
                .get(meter)
                .ok_or_else(|| PipelineError::MeterNotFound(meter.clone()))
        };
        Ok([get(&self.production)?, get(&self.owner)?, get(&self.neighbor)?])
    }
}

/// Everything a presentation layer needs to render one run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AllocationReport {
    pub meters: MeterSelection,
    pub topology: MeterTopology,
    pub tariff: TariffConfig,
    pub result: AllocationResult,
    pub neighbor_bill: NeighborBill,
}

pub fn build_report(
    merged: &MergedSeries,
    selection: &MeterSelection,
    engine: &AllocationEngine,
) -> Result<AllocationReport, PipelineError> {
    let [production, owner, neighbor] = selection.select(merged)?;
    let result = engine.allocate(production, owner, neighbor);
    let neighbor_bill = NeighborBill::from_result(&result, engine.tariff());

    Ok(AllocationReport {
        meters: selection.clone(),
        topology: engine.topology(),
        tariff: *engine.tariff(),
        result,
        neighbor_bill,
    })
}

/// Drains all sources concurrently. The first error from any source aborts
/// the gather; byte-identical sources are kept once.
pub async fn gather<S>(sources: &[S]) -> Result<Vec<ParsedSource>, PipelineError>
where
    S: Source<ParsedSource>,
{
    let drained = futures::future::join_all(
        sources
            .iter()
            .map(|s| async move { s.stream().await.collect::<Vec<_>>().await }),
    )
    .await;

    let mut parsed = Vec::new();
    for item in drained.into_iter().flatten() {
        parsed.push(item?.payload);
    }
    Ok(merge::dedup_sources(parsed))
}

pub struct Pipeline<S, K> {
    pub sources: Vec<S>,
    pub transforms: Vec<Arc<dyn Transform<MergedSeries, MergedSeries> + Send + Sync>>,
    pub selection: MeterSelection,
    pub engine: AllocationEngine,
    pub sink: K,
}

impl<S, K> Pipeline<S, K>
where
    S: Source<ParsedSource> + Send + Sync + 'static,
    K: Sink<AllocationReport> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<(), PipelineError> {
        let parsed = gather(&self.sources).await?;
        tracing::info!(sources = parsed.len(), "interval sources gathered");

        let mut env = Envelope {
            payload: merge::merge_sources(parsed.into_iter().map(|s| s.meters)),
            received_at: SystemTime::now(),
        };

        // Apply transforms in sequence (if any).
        for t in &self.transforms {
            env = t.apply(env).await?;
        }

        let report = build_report(&env.payload, &self.selection, &self.engine)?;
        tracing::info!(
            days = report.result.daily.len(),
            revenue = report.result.totals.revenue,
            neighbor_total = report.neighbor_bill.total,
            "allocation report ready"
        );

        let out = Envelope {
            payload: report,
            received_at: env.received_at,
        };
        self.sink.run(futures::stream::iter(vec![Ok(out)])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::InlineCsvSource;
    use crate::transform::DuplicateResolution;
    use meter_client::domain::DuplicateDatePolicy;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectSink {
        reports: Arc<Mutex<Vec<AllocationReport>>>,
    }

    #[async_trait::async_trait]
    impl Sink<AllocationReport> for CollectSink {
        async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
        where
            S: Stream<Item = Result<Envelope<AllocationReport>, PipelineError>> + Send + Unpin + 'static,
        {
            while let Some(item) = input.next().await {
                self.reports.lock().unwrap().push(item?.payload);
            }
            Ok(())
        }
    }

    fn selection() -> MeterSelection {
        MeterSelection {
            production: MeterIdentity::new("CH1", "1-1:2.29.0"),
            owner: MeterIdentity::new("CH1", "1-1:1.29.0"),
            neighbor: MeterIdentity::new("CH2", "1-1:1.29.0"),
        }
    }

    fn engine() -> AllocationEngine {
        AllocationEngine::new(Some(&TariffConfig::new(0.10, 0.08, 0.30)), MeterTopology::Gross).unwrap()
    }

    #[tokio::test]
    async fn runs_sources_through_to_sink() {
        let sink = CollectSink::default();
        let reports = sink.reports.clone();
        let pipeline = Pipeline {
            sources: vec![
                InlineCsvSource::new("prod.csv", "CH1;1-1:2.29.0;KWH;01.01.2025;10;20;5;0"),
                InlineCsvSource::new(
                    "usage.csv",
                    "CH1;1-1:1.29.0;KWH;01.01.2025;5;5;10;5\nCH2;1-1:1.29.0;KWH;01.01.2025;2;10;2;2",
                ),
                InlineCsvSource::new("prod-again.csv", "CH1;1-1:2.29.0;KWH;01.01.2025;10;20;5;0"),
            ],
            transforms: vec![Arc::new(DuplicateResolution::new(DuplicateDatePolicy::Reject))],
            selection: selection(),
            engine: engine(),
            sink,
        };

        pipeline.run().await.unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let totals = &reports[0].result.totals;
        assert_eq!(totals.energy.self_consumed, 15.0);
        assert_eq!(totals.energy.sold_to_neighbor, 12.0);
        assert_eq!(totals.energy.sold_to_grid, 8.0);
        approx::assert_relative_eq!(reports[0].neighbor_bill.total, 2.40, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn unknown_meter_aborts_the_run() {
        let pipeline = Pipeline {
            sources: vec![InlineCsvSource::new("prod.csv", "CH1;1-1:2.29.0;KWH;01.01.2025;1")],
            transforms: vec![],
            selection: selection(),
            engine: engine(),
            sink: CollectSink::default(),
        };

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::MeterNotFound(m) if m == selection().owner));
    }

    #[tokio::test]
    async fn parse_failure_aborts_the_gather() {
        struct BrokenSource;

        #[async_trait::async_trait]
        impl Source<ParsedSource> for BrokenSource {
            async fn stream(
                &self,
            ) -> Pin<Box<dyn Stream<Item = Result<Envelope<ParsedSource>, PipelineError>> + Send>> {
                let err = ParseError::Io {
                    path: "broken.csv".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                };
                Box::pin(futures::stream::iter(vec![Err(PipelineError::from(err))]))
            }
        }

        let err = gather(&[BrokenSource]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse(ParseError::Io { .. })));
    }
}
