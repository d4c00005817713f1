//! Live value poller for a single address.
//!
//! Each poller owns one background task that reads `<address>/~pv` once per
//! cycle. The cycle is measured from the start of a request, but a request is
//! never issued while the previous one is still outstanding. Stopping or
//! dropping the poller aborts the task, so a response arriving afterwards is
//! never applied.

use crate::change::{LiveValue, ValueTracker};
use crate::object::read_pv;
use crate::transport::VeapTransport;
use crate::types::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Default poll cycle
pub const DEFAULT_CYCLE: Duration = Duration::from_millis(400);

/// Poller configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between the starts of two consecutive reads
    pub cycle: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            cycle: DEFAULT_CYCLE,
        }
    }
}

/// Mirrors the process value of one address.
///
/// Bound to its address for life; watch another address with a new poller.
pub struct LiveValuePoller {
    address: Address,
    updates: watch::Receiver<LiveValue>,
    handle: Option<JoinHandle<()>>,
}

impl LiveValuePoller {
    /// Start polling `address`. The first read is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        transport: Arc<dyn VeapTransport>,
        address: impl Into<Address>,
        config: PollerConfig,
    ) -> Self {
        let address = address.into();
        let (tx, rx) = watch::channel(LiveValue::default());
        let handle = tokio::spawn(Self::run(transport, address.clone(), config.cycle, tx));
        info!(
            address = %address,
            cycle_ms = config.cycle.as_millis() as u64,
            "Started live value poller"
        );
        Self {
            address,
            updates: rx,
            handle: Some(handle),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Latest published state
    pub fn current(&self) -> LiveValue {
        self.updates.borrow().clone()
    }

    /// Receiver notified after every completed cycle
    pub fn subscribe(&self) -> watch::Receiver<LiveValue> {
        self.updates.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Cancel the pending timer and any outstanding request.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(address = %self.address, "Stopped live value poller");
        }
    }

    async fn run(
        transport: Arc<dyn VeapTransport>,
        address: Address,
        cycle: Duration,
        tx: watch::Sender<LiveValue>,
    ) {
        let mut tracker = ValueTracker::new();
        let mut failing = false;

        loop {
            let started = Instant::now();
            let outcome = read_pv(transport.as_ref(), &address).await;

            match &outcome {
                Ok(pv) => {
                    if failing {
                        info!(address = %address, "Process value readable again");
                    }
                    trace!(address = %address, value = %pv.value, "Read process value");
                    failing = false;
                }
                Err(err) if !failing => {
                    warn!(address = %address, error = %err, "Reading process value failed");
                    failing = true;
                }
                Err(err) => {
                    debug!(address = %address, error = %err, "Reading process value still failing")
                }
            }

            tracker.apply(outcome);
            if tx.send(tracker.current().clone()).is_err() {
                debug!(address = %address, "No observers left, poller exits");
                break;
            }

            sleep_until(started + cycle).await;
        }
    }
}

impl Drop for LiveValuePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
