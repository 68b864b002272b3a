pub mod meter_series_queries;

pub use meter_series_queries::{list_meters, load_profile, summarize, MeterSummary};
