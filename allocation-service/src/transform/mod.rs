use meter_client::domain::DuplicateDatePolicy;

use crate::merge::MergedSeries;
use crate::pipeline::{Envelope, PipelineError, Transform};

/// Applies `policy` to every meter of a merged result.
///
/// Each date that had more than one record is logged; with `Reject` the first
/// offending meter aborts the whole merge.
pub fn resolve_merged_duplicates(
    merged: MergedSeries,
    policy: DuplicateDatePolicy,
) -> Result<MergedSeries, PipelineError> {
    let mut out = MergedSeries::with_capacity(merged.len());
    for (meter, series) in merged {
        let (series, duplicates) = match series.resolve_duplicates(policy) {
            Ok(resolved) => resolved,
            Err(source) => {
                metrics::counter!("duplicate_dates_rejected_total").increment(1);
                return Err(PipelineError::DuplicateDate { meter, source });
            }
        };

        for date in &duplicates {
            tracing::warn!(meter = %meter, %date, ?policy, "meter has more than one record for date");
        }
        out.insert(meter, series);
    }
    Ok(out)
}

#[derive(Clone, Default)]
pub struct DuplicateResolution {
    pub policy: DuplicateDatePolicy,
}

impl DuplicateResolution {
    pub fn new(policy: DuplicateDatePolicy) -> Self {
        Self { policy }
    }
}

#[async_trait::async_trait]
impl Transform<MergedSeries, MergedSeries> for DuplicateResolution {
    async fn apply(
        &self,
        input: Envelope<MergedSeries>,
    ) -> Result<Envelope<MergedSeries>, PipelineError> {
        let Envelope { payload, received_at } = input;
        Ok(Envelope {
            payload: resolve_merged_duplicates(payload, self.policy)?,
            received_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_sources;
    use crate::sources::parse_str;
    use meter_client::domain::MeterIdentity;

    fn merged_with_duplicate() -> MergedSeries {
        let a = parse_str("M1;A;KWH;01.01.2025;1\nM2;A;KWH;01.01.2025;5").unwrap();
        let b = parse_str("M1;A;KWH;01.01.2025;2\nM1;A;KWH;02.01.2025;3").unwrap();
        merge_sources([a, b])
    }

    #[test]
    fn keep_last_collapses_each_meter() {
        let out = resolve_merged_duplicates(merged_with_duplicate(), DuplicateDatePolicy::KeepLast).unwrap();
        let m1 = &out[&MeterIdentity::new("M1", "A")];
        assert_eq!(m1.len(), 2);
        assert_eq!(m1.records()[0].values[0], 2.0);
        assert_eq!(out[&MeterIdentity::new("M2", "A")].len(), 1);
    }

    #[test]
    fn reject_names_the_meter() {
        let err = resolve_merged_duplicates(merged_with_duplicate(), DuplicateDatePolicy::Reject).unwrap_err();
        match err {
            PipelineError::DuplicateDate { meter, source } => {
                assert_eq!(meter, MeterIdentity::new("M1", "A"));
                assert_eq!(source.date.to_string(), "01.01.2025");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn transform_preserves_envelope_timestamp() {
        let received_at = std::time::SystemTime::UNIX_EPOCH;
        let env = Envelope {
            payload: merged_with_duplicate(),
            received_at,
        };
        let out = DuplicateResolution::new(DuplicateDatePolicy::Sum).apply(env).await.unwrap();
        assert_eq!(out.received_at, received_at);
        assert_eq!(out.payload[&MeterIdentity::new("M1", "A")].records()[0].values[0], 3.0);
    }
}
