//! In-memory VEAP object store.
//!
//! Serves node representations, process values, batch reads and value writes
//! from memory. Failures, latency and a raw batch response can be injected,
//! and every request is recorded together with the number of requests that
//! were outstanding at the same time.

use super::VeapTransport;
use crate::error::ClientError;
use crate::protocol::{self, EXCHANGE_PATH, PV_SUFFIX};
use crate::types::ProcessValue;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

/// A request seen by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<String, Value>,
    values: HashMap<String, ProcessValue>,
    failures: HashMap<String, ClientError>,
    exchange_override: Option<Result<Value, ClientError>>,
    requests: Vec<RecordedRequest>,
}

/// In-memory implementation of [`VeapTransport`]
#[derive(Default)]
pub struct MemoryTransport {
    state: RwLock<StoreState>,
    latency: RwLock<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the outstanding counter even when the request future is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write() = latency;
        self
    }

    /// Register the representation served for `address`
    pub fn insert_object(&self, address: &str, representation: Value) {
        self.state
            .write()
            .objects
            .insert(address.to_string(), representation);
    }

    /// Set the process value of `address`, stamped now with good quality
    pub fn set_value(&self, address: &str, value: Value) {
        self.set_pv(
            address,
            ProcessValue {
                value,
                timestamp: Some(Utc::now()),
                quality: Some(0),
            },
        );
    }

    pub fn set_pv(&self, address: &str, pv: ProcessValue) {
        self.state.write().values.insert(address.to_string(), pv);
    }

    /// Current process value of `address`
    pub fn value(&self, address: &str) -> Option<ProcessValue> {
        self.state.read().values.get(address).cloned()
    }

    /// Make every request to `path` fail with `error`
    ///
    /// For batch reads, failures registered on a node's `~pv` path are
    /// reported as that item's error.
    pub fn fail(&self, path: &str, error: ClientError) {
        self.state.write().failures.insert(path.to_string(), error);
    }

    pub fn clear_failure(&self, path: &str) {
        self.state.write().failures.remove(path);
    }

    /// Answer batch reads with `response` instead of computing results
    pub fn set_exchange_response(&self, response: Result<Value, ClientError>) {
        self.state.write().exchange_override = Some(response);
    }

    pub fn clear_exchange_response(&self) {
        self.state.write().exchange_override = None;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.read().requests.len()
    }

    /// Requests currently awaiting their response
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously outstanding requests seen so far
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn begin(&self, method: Method, path: &str, body: Option<Value>) -> InFlightGuard<'_> {
        self.state.write().requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(&self.in_flight)
    }

    async fn delay(&self) {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn node_of_pv_path(path: &str) -> Option<String> {
        let node = path.strip_suffix(PV_SUFFIX)?.trim_end_matches('/');
        Some(if node.is_empty() {
            "/".to_string()
        } else {
            node.to_string()
        })
    }

    fn read(&self, path: &str) -> Result<Value, ClientError> {
        let state = self.state.read();
        if let Some(err) = state.failures.get(path) {
            return Err(err.clone());
        }
        if let Some(node) = Self::node_of_pv_path(path) {
            if let Some(pv) = state.values.get(&node) {
                return Ok(protocol::encode_pv(pv));
            }
        }
        state
            .objects
            .get(path)
            .cloned()
            .ok_or_else(|| ClientError::protocol(404, Some(format!("Not found: {}", path))))
    }

    fn exchange(&self, body: &Value) -> Result<Value, ClientError> {
        let state = self.state.read();
        if let Some(response) = &state.exchange_override {
            return response.clone();
        }
        if let Some(err) = state.failures.get(EXCHANGE_PATH) {
            return Err(err.clone());
        }
        let paths = body
            .get("readPaths")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::protocol(422, Some("readPaths missing".to_string())))?;

        let results: Vec<Value> = paths
            .iter()
            .map(|path| {
                let address = path.as_str().unwrap_or_default();
                let pv_path = protocol::pv_path(address);
                let result = match state.failures.get(&pv_path) {
                    Some(err) => Err(err.clone()),
                    None => state.values.get(address).cloned().ok_or_else(|| {
                        ClientError::protocol(404, Some(format!("Not found: {}", address)))
                    }),
                };
                protocol::exchange_item(&result)
            })
            .collect();
        Ok(json!({ "readResults": results }))
    }

    fn write(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let node = Self::node_of_pv_path(path)
            .ok_or_else(|| ClientError::protocol(405, Some(format!("Not writable: {}", path))))?;
        if let Some(err) = self.state.read().failures.get(path) {
            return Err(err.clone());
        }
        let value = body
            .get("v")
            .cloned()
            .ok_or_else(|| ClientError::protocol(422, Some("Missing value".to_string())))?;
        self.set_value(&node, value);
        Ok(Value::Null)
    }
}

#[async_trait]
impl VeapTransport for MemoryTransport {
    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let _guard = self.begin(Method::Get, path, None);
        self.delay().await;
        self.read(path)
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let _guard = self.begin(Method::Put, path, Some(body.clone()));
        self.delay().await;
        if path == EXCHANGE_PATH {
            self.exchange(&body)
        } else {
            self.write(path, &body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_pv_and_object() {
        let store = MemoryTransport::new();
        store.insert_object("/dev", json!({"title": "Device"}));
        store.set_value("/dev/x", json!(3));

        let obj = store.get("/dev").await.unwrap();
        assert_eq!(obj["title"], "Device");
        let pv = store.get("/dev/x/~pv").await.unwrap();
        assert_eq!(pv["v"], 3);
        assert_eq!(pv["s"], 0);

        let err = store.get("/missing").await.unwrap_err();
        assert_eq!(err.code(), Some(404));
    }

    #[tokio::test]
    async fn test_put_pv_updates_value() {
        let store = MemoryTransport::new();
        store.put("/dev/x/~pv", json!({"v": "on"})).await.unwrap();
        assert_eq!(store.value("/dev/x").unwrap().value, json!("on"));

        let err = store.put("/dev/x", json!({"v": 1})).await.unwrap_err();
        assert_eq!(err.code(), Some(405));
    }

    #[tokio::test]
    async fn test_exchange_reports_per_item_results() {
        let store = MemoryTransport::new();
        store.set_value("/a", json!(1));
        store.fail("/b/~pv", ClientError::protocol(403, None));

        let resp = store
            .put(EXCHANGE_PATH, json!({"readPaths": ["/a", "/b", "/c"]}))
            .await
            .unwrap();
        let results = resp["readResults"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["pv"]["v"], 1);
        assert_eq!(results[1]["error"]["code"], 403);
        assert_eq!(results[2]["error"]["code"], 404);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let store = MemoryTransport::new();
        let _ = store.get("/x").await;
        let _ = store.put("/x/~pv", json!({"v": 1})).await;
        let requests = store.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[1].body, Some(json!({"v": 1})));
        assert_eq!(store.in_flight(), 0);
        assert_eq!(store.max_in_flight(), 1);
    }
}
