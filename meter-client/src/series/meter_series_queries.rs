use crate::domain::{CalendarDate, DailyIntervalRecord, MeterIdentity, MeterSeries};

/// Overview of one merged meter series, enough to let a user pick meters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterSummary {
    pub identity: MeterIdentity,
    pub days: usize,
    pub first_date: Option<CalendarDate>,
    pub last_date: Option<CalendarDate>,
    pub total_kwh: f64,
    pub duplicate_dates: Vec<CalendarDate>,
}

/// Records of `series` with `start <= date < end`, in date order.
pub fn load_profile(
    series: &MeterSeries,
    start: CalendarDate,
    end: CalendarDate,
) -> Vec<&DailyIntervalRecord> {
    let records = series.records();
    let lo = records.partition_point(|r| r.date < start);
    let hi = records.partition_point(|r| r.date < end).max(lo);
    records[lo..hi].iter().collect()
}

pub fn summarize(identity: &MeterIdentity, series: &MeterSeries) -> MeterSummary {
    MeterSummary {
        identity: identity.clone(),
        days: series.len(),
        first_date: series.first_date(),
        last_date: series.last_date(),
        total_kwh: series.iter().map(DailyIntervalRecord::total).sum(),
        duplicate_dates: series.duplicate_dates(),
    }
}

/// One summary per meter, in the order the meters are yielded.
pub fn list_meters<'a, I>(meters: I) -> Vec<MeterSummary>
where
    I: IntoIterator<Item = (&'a MeterIdentity, &'a MeterSeries)>,
{
    meters
        .into_iter()
        .map(|(identity, series)| summarize(identity, series))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntervalValues;

    fn series(dates: &[&str]) -> MeterSeries {
        dates
            .iter()
            .map(|d| DailyIntervalRecord::new(d.parse().unwrap(), IntervalValues::from_slice_padded(&[1.0, 0.5])))
            .collect()
    }

    #[test]
    fn load_profile_is_half_open() {
        let s = series(&["30.12.2024", "31.12.2024", "01.01.2025", "02.01.2025"]);
        let window = load_profile(&s, "31.12.2024".parse().unwrap(), "02.01.2025".parse().unwrap());
        let dates: Vec<String> = window.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, ["31.12.2024", "01.01.2025"]);
    }

    #[test]
    fn load_profile_with_inverted_window_is_empty() {
        let s = series(&["30.12.2024", "31.12.2024"]);
        let window = load_profile(&s, "31.12.2024".parse().unwrap(), "01.12.2024".parse().unwrap());
        assert!(window.is_empty());
    }

    #[test]
    fn summarize_reports_range_total_and_duplicates() {
        let id = MeterIdentity::new("CH1", "1-1:1.29.0");
        let s = series(&["02.01.2025", "01.01.2025", "02.01.2025"]);
        let summary = summarize(&id, &s);

        assert_eq!(summary.days, 3);
        assert_eq!(summary.first_date.unwrap().to_string(), "01.01.2025");
        assert_eq!(summary.last_date.unwrap().to_string(), "02.01.2025");
        approx::assert_relative_eq!(summary.total_kwh, 4.5);
        assert_eq!(summary.duplicate_dates.len(), 1);
    }

    #[test]
    fn list_meters_keeps_input_order() {
        let a = MeterIdentity::new("B", "x");
        let b = MeterIdentity::new("A", "x");
        let sa = series(&["01.01.2025"]);
        let sb = MeterSeries::default();
        let listed = list_meters([(&a, &sa), (&b, &sb)]);
        assert_eq!(listed[0].identity, a);
        assert_eq!(listed[1].identity, b);
        assert_eq!(listed[1].days, 0);
        assert!(listed[1].first_date.is_none());
    }
}
