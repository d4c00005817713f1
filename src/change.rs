//! Change detection for live values.
//!
//! A value is compared with the previous observation of the same subject by
//! its canonical JSON serialization. `serde_json` keeps object keys sorted, so
//! structurally equal values serialize identically.

use crate::error::ClientError;
use crate::types::ProcessValue;
use serde::Serialize;
use serde_json::Value;

/// Compares `value` with the previous serialization of the same subject.
///
/// Returns whether it changed and the new baseline. Without a previous
/// baseline nothing is ever reported as changed.
pub fn detect(previous: Option<&str>, value: &Value) -> (bool, String) {
    let current = value.to_string();
    let changed = previous.map_or(false, |prev| prev != current);
    (changed, current)
}

/// Serialization baseline of one subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeDetector {
    baseline: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation, returning whether it differs from the last one.
    pub fn observe(&mut self, value: &Value) -> bool {
        let (changed, current) = detect(self.baseline.as_deref(), value);
        self.baseline = Some(current);
        changed
    }

    /// Forget the baseline, so the next observation is not flagged.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }
}

/// What a presentation layer shows for one address
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveValue {
    pub pv: Option<ProcessValue>,
    pub error: Option<String>,
    pub changed: bool,
}

/// Applies read outcomes to a [`LiveValue`].
///
/// Shared by the single-address poller and the rows of the watch registry.
#[derive(Debug, Clone, Default)]
pub struct ValueTracker {
    current: LiveValue,
    detector: ChangeDetector,
}

impl ValueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &LiveValue {
        &self.current
    }

    /// Serialization of the last good value, if any
    pub fn last_serialized(&self) -> Option<&str> {
        self.detector.baseline()
    }

    /// Apply the outcome of one poll cycle.
    ///
    /// Any failure clears the value and the baseline, so recovering from an
    /// error is not reported as a change.
    pub fn apply(&mut self, outcome: Result<ProcessValue, ClientError>) {
        match outcome {
            Ok(pv) => {
                self.current.changed = self.detector.observe(&pv.value);
                self.current.pv = Some(pv);
                self.current.error = None;
            }
            Err(err) => self.fail(err.to_string()),
        }
    }

    /// Record a failure description without a typed error.
    pub fn fail(&mut self, description: String) {
        self.current.pv = None;
        self.current.error = Some(description);
        self.current.changed = false;
        self.detector.reset();
    }
}
