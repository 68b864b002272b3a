use std::ops::Index;

use super::CalendarDate;

/// Number of 15-minute intervals in one calendar day.
pub const INTERVALS_PER_DAY: usize = 96;

/// Exactly one day of interval readings in kWh, 00:15 through 24:00.
///
/// Never holds NaN or infinities; anything non-finite is stored as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalValues([f64; INTERVALS_PER_DAY]);

impl IntervalValues {
    pub const fn zeroed() -> Self {
        Self([0.0; INTERVALS_PER_DAY])
    }

    /// Builds a full day from `values`, zero-padding a short slice and
    /// ignoring anything past the 96th entry.
    pub fn from_slice_padded(values: &[f64]) -> Self {
        let mut out = [0.0; INTERVALS_PER_DAY];
        for (slot, v) in out.iter_mut().zip(values) {
            if v.is_finite() {
                *slot = *v;
            }
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Adds `other` interval by interval. A sum that overflows is stored as `0.0`.
    pub fn accumulate(&mut self, other: &IntervalValues) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            let sum = *a + b;
            *a = if sum.is_finite() { sum } else { 0.0 };
        }
    }
}

impl Default for IntervalValues {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Index<usize> for IntervalValues {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl From<[f64; INTERVALS_PER_DAY]> for IntervalValues {
    fn from(values: [f64; INTERVALS_PER_DAY]) -> Self {
        Self::from_slice_padded(&values)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for IntervalValues {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for IntervalValues {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<f64>::deserialize(deserializer)?;
        Ok(Self::from_slice_padded(&raw))
    }
}

/// One meter's readings for one calendar day.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailyIntervalRecord {
    pub date: CalendarDate,
    pub values: IntervalValues,
}

impl DailyIntervalRecord {
    pub fn new(date: CalendarDate, values: IntervalValues) -> Self {
        Self { date, values }
    }

    pub fn total(&self) -> f64 {
        self.values.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_slice_is_zero_padded() {
        let v = IntervalValues::from_slice_padded(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.as_slice().len(), INTERVALS_PER_DAY);
        assert_eq!(&v.as_slice()[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert!(v.as_slice()[4..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn long_slice_is_truncated() {
        let long: Vec<f64> = (0..120).map(f64::from).collect();
        let v = IntervalValues::from_slice_padded(&long);
        assert_eq!(v[95], 95.0);
        assert_eq!(v.total(), (0..96).map(f64::from).sum::<f64>());
    }

    #[test]
    fn non_finite_values_become_zero() {
        let v = IntervalValues::from_slice_padded(&[f64::NAN, f64::INFINITY, 2.5]);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[1], 0.0);
        assert_eq!(v[2], 2.5);
    }

    #[test]
    fn accumulate_adds_per_interval() {
        let mut a = IntervalValues::from_slice_padded(&[1.0, 2.0]);
        a.accumulate(&IntervalValues::from_slice_padded(&[0.5, 0.5, 3.0]));
        assert_eq!(&a.as_slice()[..3], &[1.5, 2.5, 3.0]);
    }

    #[test]
    fn overflowing_sum_is_stored_as_zero() {
        let mut a = IntervalValues::from_slice_padded(&[1e308, 1.0]);
        a.accumulate(&IntervalValues::from_slice_padded(&[1e308, 1.0]));
        assert_eq!(a[0], 0.0);
        assert_eq!(a[1], 2.0);
    }
}
