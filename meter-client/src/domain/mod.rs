mod allocation_result;
mod calendar_date;
mod interval_record;
mod meter_identity;
mod meter_series;
mod tariff;

pub use allocation_result::{AllocationResult, AllocationTotals, DailyStats, EnergyFlows};
pub use calendar_date::{CalendarDate, DateParseError};
pub use interval_record::{DailyIntervalRecord, IntervalValues, INTERVALS_PER_DAY};
pub use meter_identity::MeterIdentity;
pub use meter_series::{DuplicateDateError, DuplicateDatePolicy, MeterSeries};
pub use tariff::{ConfigurationError, MeterTopology, TariffConfig};
