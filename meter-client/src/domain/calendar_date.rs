use std::{fmt, str::FromStr};

use time::{Date, Month};

/// A calendar day without time-of-day, as written by meter exports (`DD.MM.YYYY`).
///
/// Ordering is chronological: it compares year, then month, then day
/// numerically, never the textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(Date);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid calendar date '{input}': expected DD.MM.YYYY")]
pub struct DateParseError {
    pub input: String,
}

impl CalendarDate {
    pub fn from_calendar(year: i32, month: u8, day: u8) -> Result<Self, DateParseError> {
        let invalid = || DateParseError {
            input: format!("{day:02}.{month:02}.{year:04}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    pub fn date(&self) -> Date {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u8 {
        u8::from(self.0.month())
    }

    pub fn day(&self) -> u8 {
        self.0.day()
    }
}

impl From<Date> for CalendarDate {
    fn from(date: Date) -> Self {
        Self(date)
    }
}

impl FromStr for CalendarDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || DateParseError {
            input: trimmed.to_string(),
        };

        let mut parts = trimmed.split('.');
        let (Some(day), Some(month), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let day: u8 = day.trim().parse().map_err(|_| invalid())?;
        let month: u8 = month.trim().parse().map_err(|_| invalid())?;
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;

        Self::from_calendar(year, month, day).map_err(|_| invalid())
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.day(), self.month(), self.year())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CalendarDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CalendarDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
