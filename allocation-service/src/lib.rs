pub mod allocation;
pub mod api;
pub mod config;
pub mod merge;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use allocation::{compute_allocation, AllocationEngine};
pub use merge::merge_sources;
pub use pipeline::{Envelope, Pipeline};
pub use sources::parse_source;
