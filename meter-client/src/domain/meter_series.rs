use super::{CalendarDate, DailyIntervalRecord};

/// How to collapse several records that share a date within one meter series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DuplicateDatePolicy {
    /// Leave duplicates in place.
    KeepAll,
    /// The record merged last wins.
    #[default]
    KeepLast,
    /// Interval-wise sum of all records for the date.
    Sum,
    /// Refuse the series.
    Reject,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("more than one record for {date}")]
pub struct DuplicateDateError {
    pub date: CalendarDate,
}

/// Daily records of one meter in ascending date order.
///
/// Sorting is stable: records sharing a date keep the order they were added
/// in. Uniqueness of dates is only guaranteed after [`MeterSeries::resolve_duplicates`]
/// with a policy other than `KeepAll`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "Vec<DailyIntervalRecord>", into = "Vec<DailyIntervalRecord>")
)]
pub struct MeterSeries {
    records: Vec<DailyIntervalRecord>,
}

impl MeterSeries {
    pub fn from_records(mut records: Vec<DailyIntervalRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[DailyIntervalRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DailyIntervalRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyIntervalRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<CalendarDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<CalendarDate> {
        self.records.last().map(|r| r.date)
    }

    /// Record for `date`; with duplicates present, the last one added.
    pub fn get(&self, date: CalendarDate) -> Option<&DailyIntervalRecord> {
        let end = self.records.partition_point(|r| r.date <= date);
        end.checked_sub(1)
            .map(|idx| &self.records[idx])
            .filter(|r| r.date == date)
    }

    /// Every date that occurs more than once, each reported once.
    pub fn duplicate_dates(&self) -> Vec<CalendarDate> {
        let mut out: Vec<CalendarDate> = Vec::new();
        for pair in self.records.windows(2) {
            if pair[0].date == pair[1].date && out.last() != Some(&pair[0].date) {
                out.push(pair[0].date);
            }
        }
        out
    }

    /// Applies `policy` and returns the resulting series together with the
    /// dates that had more than one record.
    pub fn resolve_duplicates(
        self,
        policy: DuplicateDatePolicy,
    ) -> Result<(MeterSeries, Vec<CalendarDate>), DuplicateDateError> {
        let duplicates = self.duplicate_dates();
        if duplicates.is_empty() || policy == DuplicateDatePolicy::KeepAll {
            return Ok((self, duplicates));
        }
        if policy == DuplicateDatePolicy::Reject {
            return Err(DuplicateDateError { date: duplicates[0] });
        }

        let mut collapsed: Vec<DailyIntervalRecord> = Vec::with_capacity(self.records.len());
        for record in self.records {
            match collapsed.last_mut() {
                Some(prev) if prev.date == record.date => match policy {
                    DuplicateDatePolicy::Sum => prev.values.accumulate(&record.values),
                    _ => *prev = record,
                },
                _ => collapsed.push(record),
            }
        }

        Ok((MeterSeries { records: collapsed }, duplicates))
    }
}

impl From<MeterSeries> for Vec<DailyIntervalRecord> {
    fn from(series: MeterSeries) -> Self {
        series.records
    }
}

impl From<Vec<DailyIntervalRecord>> for MeterSeries {
    fn from(records: Vec<DailyIntervalRecord>) -> Self {
        Self::from_records(records)
    }
}

impl FromIterator<DailyIntervalRecord> for MeterSeries {
    fn from_iter<I: IntoIterator<Item = DailyIntervalRecord>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MeterSeries {
    type Item = &'a DailyIntervalRecord;
    type IntoIter = std::slice::Iter<'a, DailyIntervalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
