//! Watch service: drives the registry's poll cycle.

use super::registry::{PollSummary, WatchRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Completed cycle notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Number of completed polls since start
    pub cycle: u64,
    pub summary: PollSummary,
}

/// Owns the polling task of a [`WatchRegistry`].
///
/// The next poll is scheduled one cycle after the previous one completed, so
/// at most one batch request is outstanding. Stopping or dropping the service
/// cancels the task before a late response can be applied.
pub struct WatchService {
    registry: Arc<WatchRegistry>,
    reports: watch::Receiver<CycleReport>,
    handle: Option<JoinHandle<()>>,
}

impl WatchService {
    /// Start polling `registry` every `cycle`, beginning immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(registry: Arc<WatchRegistry>, cycle: Duration) -> Self {
        let (tx, rx) = watch::channel(CycleReport::default());
        let handle = tokio::spawn(Self::run(Arc::clone(&registry), cycle, tx));
        info!(
            cycle_ms = cycle.as_millis() as u64,
            watched = registry.len(),
            "Started watch service"
        );
        Self {
            registry,
            reports: rx,
            handle: Some(handle),
        }
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    /// Receiver notified after every completed poll
    pub fn subscribe(&self) -> watch::Receiver<CycleReport> {
        self.reports.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Cancel the pending timer and any outstanding batch request.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Stopped watch service");
        }
    }

    async fn run(registry: Arc<WatchRegistry>, cycle: Duration, tx: watch::Sender<CycleReport>) {
        let mut count = 0u64;
        loop {
            let summary = registry.poll().await;
            count += 1;
            debug!(
                cycle = count,
                requested = summary.requested,
                errors = summary.errors,
                "Watch cycle completed"
            );
            if tx
                .send(CycleReport {
                    cycle: count,
                    summary,
                })
                .is_err()
            {
                break;
            }
            sleep(cycle).await;
        }
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        self.stop();
    }
}
