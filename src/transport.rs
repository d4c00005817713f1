//! Remote read/write primitive shared by the object client, pollers and the
//! watch registry.

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, Method, RecordedRequest};

use crate::error::ClientError;
use async_trait::async_trait;
use serde_json::Value;

/// Access to a VEAP server.
///
/// Paths are absolute addresses, including any service suffix. Calls are the
/// only suspension points of the polling engine.
#[async_trait]
pub trait VeapTransport: Send + Sync {
    /// Read the representation at `path`.
    async fn get(&self, path: &str) -> Result<Value, ClientError>;

    /// Write `body` to `path`. An empty success body is returned as `Null`.
    async fn put(&self, path: &str, body: Value) -> Result<Value, ClientError>;
}
