//! Watch registry: batch polling of a caller-mutable address list.

use crate::change::{LiveValue, ValueTracker};
use crate::error::ClientError;
use crate::protocol::{self, EXCHANGE_PATH};
use crate::transport::VeapTransport;
use crate::types::{Address, ProcessValue};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A watched address and its last observed state
#[derive(Debug, Clone)]
pub struct WatchedDataPoint {
    id: u64,
    pub name: String,
    pub address: Address,
    tracker: ValueTracker,
}

impl WatchedDataPoint {
    pub fn live(&self) -> &LiveValue {
        self.tracker.current()
    }

    pub fn pv(&self) -> Option<&ProcessValue> {
        self.tracker.current().pv.as_ref()
    }

    pub fn changed(&self) -> bool {
        self.tracker.current().changed
    }

    pub fn error(&self) -> Option<&str> {
        self.tracker.current().error.as_deref()
    }

    /// Serialization of the last good value, the change detection baseline
    pub fn last_serialized(&self) -> Option<&str> {
        self.tracker.last_serialized()
    }
}

/// Serializable view of a data point
#[derive(Debug, Clone, Serialize)]
pub struct DataPointView {
    pub name: String,
    pub address: Address,
    #[serde(flatten)]
    pub live: LiveValue,
}

impl From<&WatchedDataPoint> for DataPointView {
    fn from(point: &WatchedDataPoint) -> Self {
        Self {
            name: point.name.clone(),
            address: point.address.clone(),
            live: point.live().clone(),
        }
    }
}

/// Outcome summary of one registry poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Addresses included in the request
    pub requested: usize,
    /// Rows updated with a value
    pub values: usize,
    /// Rows updated with an error
    pub errors: usize,
    /// Rows removed while the request was outstanding
    pub skipped: usize,
}

/// Ordered set of watched addresses, unique by address.
///
/// Created by the presentation layer and shared via `Arc`; rows may be added
/// or removed at any time, including while a poll is outstanding.
pub struct WatchRegistry {
    transport: Arc<dyn VeapTransport>,
    points: RwLock<Vec<WatchedDataPoint>>,
    next_id: AtomicU64,
}

impl WatchRegistry {
    pub fn new(transport: Arc<dyn VeapTransport>) -> Self {
        Self {
            transport,
            points: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Append a new row for `address`.
    pub fn add(
        &self,
        name: impl Into<String>,
        address: impl Into<Address>,
    ) -> Result<(), ClientError> {
        let address = address.into();
        let mut points = self.points.write();
        if points.iter().any(|p| p.address == address) {
            return Err(ClientError::AlreadyWatched(address));
        }
        let name = name.into();
        debug!(name = %name, address = %address, "Watching address");
        points.push(WatchedDataPoint {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name,
            address,
            tracker: ValueTracker::new(),
        });
        Ok(())
    }

    /// Remove the row for `address`. Returns whether a row was removed.
    pub fn remove(&self, address: &str) -> bool {
        let mut points = self.points.write();
        let before = points.len();
        points.retain(|p| p.address != address);
        let removed = points.len() != before;
        if removed {
            debug!(address, "Stopped watching address");
        }
        removed
    }

    pub fn contains(&self, address: &str) -> bool {
        self.points.read().iter().any(|p| p.address == address)
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Copy of the rows in insertion order
    pub fn points(&self) -> Vec<WatchedDataPoint> {
        self.points.read().clone()
    }

    pub fn get(&self, address: &str) -> Option<WatchedDataPoint> {
        self.points
            .read()
            .iter()
            .find(|p| p.address == address)
            .cloned()
    }

    pub fn views(&self) -> Vec<DataPointView> {
        self.points.read().iter().map(DataPointView::from).collect()
    }

    /// Read all watched addresses in one batch request.
    ///
    /// The request covers a snapshot of the rows taken before it is issued and
    /// the response is applied to that snapshot only: rows added meanwhile are
    /// left alone, rows removed meanwhile are skipped.
    pub async fn poll(&self) -> PollSummary {
        let snapshot: Vec<(u64, Address)> = self
            .points
            .read()
            .iter()
            .map(|p| (p.id, p.address.clone()))
            .collect();
        if snapshot.is_empty() {
            return PollSummary::default();
        }

        let addresses: Vec<Address> = snapshot.iter().map(|(_, a)| a.clone()).collect();
        let response = self
            .transport
            .put(EXCHANGE_PATH, protocol::exchange_request(&addresses))
            .await
            .and_then(|body| protocol::decode_exchange(&body, snapshot.len()));

        let mut summary = PollSummary {
            requested: snapshot.len(),
            ..PollSummary::default()
        };
        let mut points = self.points.write();
        match response {
            Ok(items) => {
                for ((id, address), item) in snapshot.iter().zip(items) {
                    let Some(point) = points.iter_mut().find(|p| p.id == *id) else {
                        summary.skipped += 1;
                        continue;
                    };
                    match &item {
                        Ok(_) => summary.values += 1,
                        Err(err) => {
                            summary.errors += 1;
                            debug!(address = %address, error = %err, "Batch item failed");
                        }
                    }
                    point.tracker.apply(item);
                }
            }
            Err(err) => {
                warn!(count = snapshot.len(), error = %err, "Batch read failed");
                let description = err.to_string();
                for (id, _) in &snapshot {
                    match points.iter_mut().find(|p| p.id == *id) {
                        Some(point) => {
                            point.tracker.fail(description.clone());
                            summary.errors += 1;
                        }
                        None => summary.skipped += 1,
                    }
                }
            }
        }
        summary
    }
}
