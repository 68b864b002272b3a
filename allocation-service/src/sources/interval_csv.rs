//! Parser for semicolon-delimited interval meter exports.
//!
//! One row is one meter-day, no header:
//!
//! ```text
//! serial;stream_code;unit;DD.MM.YYYY;v1;v2;...;v96
//! ```
//!
//! Values cover 00:15 through 24:00 in 15-minute steps. Short rows are
//! zero-padded, extra columns are ignored, and a cell that is not a number
//! reads as `0.0`.

use std::{io::Read, path::PathBuf};

use csv::ByteRecord;
use indexmap::IndexMap;
use meter_client::domain::{
    CalendarDate, DailyIntervalRecord, IntervalValues, MeterIdentity, INTERVALS_PER_DAY,
};

const SERIAL_COLUMN: usize = 0;
const STREAM_CODE_COLUMN: usize = 1;
const DATE_COLUMN: usize = 3;
const FIRST_VALUE_COLUMN: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("failed to split CSV rows: {0}")]
    Read(#[from] csv::Error),
    #[error("failed to read interval CSV '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Records per meter, meters in first-seen order, records in file order.
pub type ParserOutput = IndexMap<MeterIdentity, Vec<DailyIntervalRecord>>;

/// A parsed source together with where it came from and a content fingerprint.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub name: String,
    /// blake3 of the raw bytes; equal fingerprints mean byte-identical sources.
    pub fingerprint: String,
    pub meters: ParserOutput,
}

impl ParsedSource {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ParseError> {
        let fingerprint = blake3::hash(bytes).to_hex().to_string();
        let meters = parse_source(bytes)?;
        Ok(Self {
            name: name.into(),
            fingerprint,
            meters,
        })
    }

    pub fn record_count(&self) -> usize {
        self.meters.values().map(Vec::len).sum()
    }
}

pub fn parse_str(text: &str) -> Result<ParserOutput, ParseError> {
    parse_source(text.as_bytes())
}

/// Groups all rows of `reader` by meter identity.
///
/// Fails only when the reader itself fails. Cells are decoded one by one, so
/// a cell that is not UTF-8 reads as `0.0` (values) or is decoded lossily
/// (identity columns). Rows without a readable date are skipped and counted.
pub fn parse_source<R: Read>(reader: R) -> Result<ParserOutput, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut meters = ParserOutput::new();
    let mut rows = 0u64;
    let mut skipped = 0u64;
    let mut coerced = 0u64;

    for result in rdr.byte_records() {
        let record = result?;
        rows += 1;

        match record_to_daily(&record) {
            Some((identity, daily, bad_cells)) => {
                coerced += bad_cells;
                meters.entry(identity).or_default().push(daily);
            }
            None => {
                skipped += 1;
                tracing::warn!(
                    line = record.position().map(|p| p.line()),
                    date = %record.get(DATE_COLUMN).map(String::from_utf8_lossy).unwrap_or_default(),
                    "skipping interval row without a valid DD.MM.YYYY date"
                );
            }
        }
    }

    metrics::counter!("interval_csv_rows_total").increment(rows);
    metrics::counter!("interval_csv_skipped_rows_total").increment(skipped);
    metrics::counter!("interval_csv_coerced_cells_total").increment(coerced);
    tracing::debug!(rows, skipped, coerced, meters = meters.len(), "parsed interval CSV");

    Ok(meters)
}

fn record_to_daily(record: &ByteRecord) -> Option<(MeterIdentity, DailyIntervalRecord, u64)> {
    let date: CalendarDate = std::str::from_utf8(record.get(DATE_COLUMN)?).ok()?.parse().ok()?;
    let identity = MeterIdentity::new(
        text_cell(record, SERIAL_COLUMN),
        text_cell(record, STREAM_CODE_COLUMN),
    );

    let mut values = [0.0; INTERVALS_PER_DAY];
    let mut bad_cells = 0;
    for (slot, cell) in values
        .iter_mut()
        .zip(record.iter().skip(FIRST_VALUE_COLUMN))
    {
        match std::str::from_utf8(cell).ok().and_then(parse_interval_value) {
            Some(v) => *slot = v,
            None if cell.is_empty() => {}
            None => bad_cells += 1,
        }
    }

    Some((
        identity,
        DailyIntervalRecord::new(date, IntervalValues::from_slice_padded(&values)),
        bad_cells,
    ))
}

fn text_cell(record: &ByteRecord, column: usize) -> String {
    record
        .get(column)
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .unwrap_or_default()
}

/// Reads a kWh cell; accepts `.` or `,` as decimal separator.
fn parse_interval_value(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>()
        .ok()
        .or_else(|| cell.replace(',', ".").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
