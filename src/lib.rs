//! veap-watch: VEAP Monitoring Client
//!
//! Client for servers speaking VEAP, the REST protocol exposing a device
//! tree of nodes with process values. Provides path handling, node
//! navigation, single data point polling with change detection and batch
//! watching of many data points.

pub mod change;
pub mod config;
pub mod error;
pub mod format;
pub mod input;
pub mod logging;
pub mod object;
pub mod path;
pub mod poller;
pub mod protocol;
pub mod tooling;
pub mod transport;
pub mod types;
pub mod watch;

pub use change::{ChangeDetector, LiveValue};
pub use error::ClientError;
pub use object::ObjectClient;
pub use poller::{LiveValuePoller, PollerConfig};
pub use transport::{HttpTransport, MemoryTransport, VeapTransport};
pub use types::{Address, Link, ProcessValue, VeapObject};
pub use watch::{WatchRegistry, WatchService};
