//! Object client: node retrieval and hyperlink navigation.

use crate::error::ClientError;
use crate::path::resolve_path;
use crate::protocol::{self, PV_SUFFIX};
use crate::transport::VeapTransport;
use crate::types::{Address, Link, LogMessage, ProcessValue, VeapObject};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Reads nodes and process values from a VEAP server
#[derive(Clone)]
pub struct ObjectClient {
    transport: Arc<dyn VeapTransport>,
}

impl ObjectClient {
    pub fn new(transport: Arc<dyn VeapTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn VeapTransport> {
        &self.transport
    }

    /// Fetch the node at `address`.
    pub async fn fetch(&self, address: &str) -> Result<VeapObject, ClientError> {
        let body = self.transport.get(address).await?;
        let object = protocol::decode_object(address, &body)?;
        debug!(
            address,
            links = object.links.len(),
            variable = object.has_process_value(),
            "Fetched object"
        );
        Ok(object)
    }

    /// Read the current process value of `address` once.
    pub async fn read_pv(&self, address: &str) -> Result<ProcessValue, ClientError> {
        read_pv(self.transport.as_ref(), address).await
    }

    /// Write a new value to the process value of `address`.
    pub async fn write_pv(&self, address: &str, value: Value) -> Result<(), ClientError> {
        self.transport
            .put(&protocol::pv_path(address), json!({ "v": value }))
            .await?;
        debug!(address, "Wrote process value");
        Ok(())
    }

    /// Version string reported by the server vendor information.
    pub async fn server_version(&self) -> Result<String, ClientError> {
        let body = self.transport.get(protocol::VENDOR_PATH).await?;
        body.get("serverVersion")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::malformed("Vendor information has no server version"))
    }

    /// Ask the server to reload its device and program metadata.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.transport
            .put(protocol::REFRESH_PATH, json!({ "v": true }))
            .await?;
        debug!("Requested server refresh");
        Ok(())
    }

    /// Log messages of the server diagnostics.
    pub async fn diagnostics(&self) -> Result<Vec<LogMessage>, ClientError> {
        let body = self.transport.get(protocol::DIAGNOSTICS_PATH).await?;
        let pv = protocol::decode_pv(&body)?;
        protocol::decode_diagnostics(&pv)
    }
}

/// Single process value read, decoded into a tagged result.
pub(crate) async fn read_pv(
    transport: &dyn VeapTransport,
    address: &str,
) -> Result<ProcessValue, ClientError> {
    let body = transport.get(&protocol::pv_path(address)).await?;
    protocol::decode_pv(&body)
}

impl VeapObject {
    /// A node carries a live value exactly when it links its `~pv` sub-resource.
    pub fn has_process_value(&self) -> bool {
        self.links.iter().any(|l| l.href.ends_with(PV_SUFFIX))
    }

    /// Links to other nodes, parent first.
    pub fn navigable_links(&self) -> Vec<Link> {
        select_navigable_links(&self.links)
    }

    /// Absolute address of a link target relative to this node.
    pub fn resolve(&self, href: &str) -> Address {
        resolve_path(&self.address, href)
    }

    /// Extra properties for display, sorted case-insensitively by key.
    pub fn display_properties(&self) -> Vec<(&String, &Value)> {
        let mut props: Vec<_> = self
            .properties
            .iter()
            .filter(|(key, _)| key.as_str() != "identifier")
            .collect();
        props.sort_by(|(a, _), (b, _)| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        props
    }
}

/// Drops service links and sorts the rest into a stable navigation order.
///
/// Order: the parent link `..`; then by relation; then titled links by title
/// ahead of untitled ones; then by target. Links lacking a relation sort after
/// those having one. Comparisons ignore case, with the exact text as the final
/// tiebreak so equal-ignoring-case entries still get a fixed position.
pub fn select_navigable_links(links: &[Link]) -> Vec<Link> {
    let mut navigable: Vec<Link> = links
        .iter()
        .filter(|l| !protocol::is_service_href(&l.href))
        .cloned()
        .collect();
    navigable.sort_by(compare_links);
    navigable
}

fn compare_links(a: &Link, b: &Link) -> Ordering {
    b.is_parent()
        .cmp(&a.is_parent())
        .then_with(|| compare_optional(a.rel.as_deref(), b.rel.as_deref()))
        .then_with(|| compare_optional(a.title.as_deref(), b.title.as_deref()))
        .then_with(|| compare_text(&a.href, &b.href))
}

/// Present values first, compared ignoring case.
fn compare_optional(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_text(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
