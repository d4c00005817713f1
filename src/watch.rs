//! Multi-address watching: the registry and the service polling it.

mod registry;
mod runtime;

pub use registry::{DataPointView, PollSummary, WatchRegistry, WatchedDataPoint};
pub use runtime::{CycleReport, WatchService};
