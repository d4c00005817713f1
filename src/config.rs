//! Configuration for the VEAP client.
//!
//! Layered with the `config` crate: built-in defaults, the global file in the
//! XDG config directory, an explicit file, then `VEAP_WATCH__*` environment
//! variables. Command-line flags are applied on top by the CLI.

pub mod facade;
mod merge;
pub mod paths;
mod sources;
pub mod validation;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::poller::DEFAULT_CYCLE;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "VEAP_WATCH";

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VeapConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Data points added to the watch list on startup
    #[serde(default)]
    pub watch: Vec<WatchEntry>,
}

/// VEAP server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the server
    #[serde(default = "default_url")]
    pub url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_url() -> String {
    "http://127.0.0.1:2121".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Poll cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Cycle of single-address pollers in milliseconds
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
    /// Cycle of the watch list in milliseconds
    #[serde(default = "default_cycle_ms")]
    pub watch_cycle_ms: u64,
}

fn default_cycle_ms() -> u64 {
    DEFAULT_CYCLE.as_millis() as u64
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            cycle_ms: default_cycle_ms(),
            watch_cycle_ms: default_cycle_ms(),
        }
    }
}

impl PollingConfig {
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }

    pub fn watch_cycle(&self) -> Duration {
        Duration::from_millis(self.watch_cycle_ms)
    }
}

/// Configured watch list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    /// Display name; defaults to the address
    #[serde(default)]
    pub name: Option<String>,
    pub address: Address,
}

impl WatchEntry {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}
