//! Core types for the VEAP object model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Address: slash-separated path of a node in the remote object graph
pub type Address = String;

/// Typed hyperlink from one node to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target, absolute or relative to the emitting node
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: None,
            title: None,
        }
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The literal parent link
    pub fn is_parent(&self) -> bool {
        self.href == ".."
    }
}

/// A node fetched from the object store
///
/// Not cached beyond the caller's view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VeapObject {
    /// Address the node was fetched from
    pub address: Address,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Every other key of the representation
    pub properties: BTreeMap<String, Value>,
    pub links: Vec<Link>,
}

/// Live value of a variable node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessValue {
    pub value: Value,
    pub timestamp: Option<DateTime<Utc>>,
    pub quality: Option<i64>,
}

impl ProcessValue {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            timestamp: None,
            quality: None,
        }
    }

    pub fn quality_band(&self) -> Option<Quality> {
        self.quality.map(Quality::from_code)
    }
}

/// Coarse health classification of a process value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Good(i64),
    Uncertain(i64),
    Bad(i64),
    Unknown(i64),
}

impl Quality {
    pub fn from_code(code: i64) -> Self {
        match code {
            0..=99 => Quality::Good(code),
            100..=199 => Quality::Uncertain(code),
            200..=299 => Quality::Bad(code),
            _ => Quality::Unknown(code),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Good(c) => write!(f, "GOOD ({})", c),
            Quality::Uncertain(c) => write!(f, "UNCERTAIN ({})", c),
            Quality::Bad(c) => write!(f, "BAD ({})", c),
            Quality::Unknown(c) => write!(f, "? ({})", c),
        }
    }
}

/// Entry of the server's diagnostic log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub module: String,
    pub message: String,
}
