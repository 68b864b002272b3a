//! Joins parser outputs from several sources into one series per meter.

use std::collections::HashSet;

use indexmap::IndexMap;
use meter_client::domain::{DailyIntervalRecord, MeterIdentity, MeterSeries};

use crate::sources::{ParsedSource, ParserOutput};

/// One date-sorted series per meter, meters in first-seen order.
pub type MergedSeries = IndexMap<MeterIdentity, MeterSeries>;

/// Concatenates every source's records per meter and sorts each meter's
/// records by calendar date.
///
/// Records sharing a date are all kept, adjacent and in merge order; see
/// `transform::resolve_merged_duplicates` for collapsing them.
pub fn merge_sources<I, M, V>(outputs: I) -> MergedSeries
where
    I: IntoIterator<Item = M>,
    M: IntoIterator<Item = (MeterIdentity, V)>,
    V: Into<Vec<DailyIntervalRecord>>,
{
    let mut combined: IndexMap<MeterIdentity, Vec<DailyIntervalRecord>> = IndexMap::new();
    for output in outputs {
        for (identity, records) in output {
            combined.entry(identity).or_default().extend(records.into());
        }
    }

    let merged: MergedSeries = combined
        .into_iter()
        .map(|(identity, records)| (identity, MeterSeries::from_records(records)))
        .collect();

    let duplicates: usize = merged.values().map(|s| s.duplicate_dates().len()).sum();
    if duplicates > 0 {
        metrics::counter!("merge_duplicate_dates_total").increment(duplicates as u64);
    }
    tracing::debug!(meters = merged.len(), duplicates, "merged interval sources");

    merged
}

/// Drops sources whose content was already seen, keeping the first.
pub fn dedup_sources<I>(sources: I) -> Vec<ParsedSource>
where
    I: IntoIterator<Item = ParsedSource>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for source in sources {
        if seen.insert(source.fingerprint.clone()) {
            out.push(source);
        } else {
            tracing::warn!(source = %source.name, "skipping source identical to one already loaded");
            metrics::counter!("merge_identical_sources_skipped_total").increment(1);
        }
    }
    out
}

/// Fingerprint-deduplicates `sources`, then merges them.
pub fn merge_parsed<I>(sources: I) -> MergedSeries
where
    I: IntoIterator<Item = ParsedSource>,
{
    merge_sources(dedup_sources(sources).into_iter().map(|s| s.meters))
}

/// A merged result in parser-output shape, so it can be merged again.
pub fn into_parser_output(merged: MergedSeries) -> ParserOutput {
    merged
        .into_iter()
        .map(|(identity, series)| (identity, series.into_records()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::parse_str;

    fn output(rows: &[(&str, &str, f64)]) -> ParserOutput {
        let csv: Vec<String> = rows
            .iter()
            .map(|(meter, date, v)| format!("{meter};A;KWH;{date};{v}"))
            .collect();
        parse_str(&csv.join("\n")).unwrap()
    }

    fn dates(merged: &MergedSeries, meter: &str) -> Vec<String> {
        merged[&MeterIdentity::new(meter, "A")]
            .iter()
            .map(|r| r.date.to_string())
            .collect()
    }

    #[test]
    fn merges_by_identity_and_sorts_chronologically() {
        let a = output(&[("M1", "01.01.2025", 1.0), ("M2", "05.01.2025", 1.0)]);
        let b = output(&[("M1", "31.12.2024", 2.0), ("M1", "02.01.2025", 3.0)]);

        let merged = merge_sources([a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(dates(&merged, "M1"), ["31.12.2024", "01.01.2025", "02.01.2025"]);
        assert_eq!(dates(&merged, "M2"), ["05.01.2025"]);
    }

    #[test]
    fn duplicate_dates_are_kept_in_merge_order() {
        let a = output(&[("M1", "01.01.2025", 1.0)]);
        let b = output(&[("M1", "01.01.2025", 2.0)]);

        let merged = merge_sources([a, b]);
        let series = &merged[&MeterIdentity::new("M1", "A")];
        let firsts: Vec<f64> = series.iter().map(|r| r.values[0]).collect();
        assert_eq!(firsts, [1.0, 2.0]);
    }

    #[test]
    fn merge_is_associative() {
        let a = output(&[("M1", "03.01.2025", 1.0), ("M2", "01.01.2025", 1.0)]);
        let b = output(&[("M1", "01.01.2025", 2.0)]);
        let c = output(&[("M1", "02.01.2025", 3.0), ("M3", "01.01.2025", 3.0)]);

        let flat = merge_sources([a.clone(), b.clone(), c.clone()]);
        let nested = merge_sources([into_parser_output(merge_sources([a, b])), c]);
        assert_eq!(flat, nested);
    }

    #[test]
    fn self_merge_then_dedup_reproduces_series() {
        let a = output(&[("M1", "30.12.2024", 1.0), ("M1", "31.12.2024", 2.0), ("M1", "01.01.2025", 3.0)]);
        let original = merge_sources([a.clone()]);
        let doubled = merge_sources([a.clone(), a]);

        let series = doubled[&MeterIdentity::new("M1", "A")].clone();
        assert_eq!(series.len(), 6);
        let (deduped, dups) = series
            .resolve_duplicates(meter_client::domain::DuplicateDatePolicy::KeepLast)
            .unwrap();
        assert_eq!(dups.len(), 3);
        assert_eq!(&deduped, &original[&MeterIdentity::new("M1", "A")]);
    }

    #[test]
    fn identical_sources_are_merged_once() {
        let text = "M1;A;KWH;01.01.2025;1";
        let first = ParsedSource::from_bytes("first.csv", text.as_bytes()).unwrap();
        let again = ParsedSource::from_bytes("again.csv", text.as_bytes()).unwrap();

        let merged = merge_parsed([first, again]);
        assert_eq!(merged[&MeterIdentity::new("M1", "A")].len(), 1);
    }
}
