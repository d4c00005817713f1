//! CLI Tooling
//!
//! Command-line interface for browsing a VEAP server, reading and writing
//! process values and watching data points.

use crate::change::LiveValue;
use crate::config::{ConfigLoader, VeapConfig};
use crate::error::ClientError;
use crate::format::{
    format_live_value_text, format_log_text, format_object_text, format_watch_list_text,
    pretty_value,
};
use crate::input::parse_value_for;
use crate::logging::apply_env_overrides;
use crate::object::ObjectClient;
use crate::path::{clean_path, resolve_path};
use crate::poller::{LiveValuePoller, PollerConfig};
use crate::transport::{HttpTransport, VeapTransport};
use crate::types::Address;
use crate::watch::{WatchRegistry, WatchService};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// VEAP client - browse and monitor a VEAP server
#[derive(Parser, Debug)]
#[command(name = "veap-watch")]
#[command(about = "Browse, read, write and watch data points of a VEAP server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides server.url)
    #[arg(long)]
    pub server: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Normalize a path
    Clean { path: String },
    /// Resolve a path relative to a base address
    Resolve { base: String, path: String },
    /// Show a node with its properties and links
    Browse {
        #[arg(default_value = "/")]
        address: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Read the process value of a data point once
    Read {
        address: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Write a value, converted to the type of the current value
    Write { address: String, value: String },
    /// Poll one data point until interrupted
    Monitor {
        address: String,
        /// Poll cycle in milliseconds (default: polling.cycle_ms)
        #[arg(long)]
        cycle_ms: Option<u64>,
        /// Stop after this many updates
        #[arg(long)]
        updates: Option<usize>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Watch several data points with batch reads until interrupted
    Watch {
        /// Data points as `address` or `name=address`
        points: Vec<String>,
        /// Poll cycle in milliseconds (default: polling.watch_cycle_ms)
        #[arg(long)]
        cycle_ms: Option<u64>,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the server version
    Info,
    /// Show the server's diagnostic log
    Diagnostics,
    /// Make the server reload names, rooms, system variables and programs
    Refresh,
    /// Show the effective configuration as TOML
    Config,
}

impl Cli {
    /// Load configuration, then apply the logging environment, then
    /// command-line flags.
    pub fn load_config(&self) -> Result<VeapConfig, ClientError> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        apply_env_overrides(&mut config.logging);
        self.apply_overrides(&mut config);
        crate::config::validation::validate_config(&config).into_result()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut VeapConfig) {
        if let Some(server) = &self.server {
            config.server.url = server.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
            config.logging.filter = None;
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

/// Output of a text or json command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self, ClientError> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ClientError::InvalidValue(format!(
                "unknown format '{}' (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

/// CLI context for executing commands
pub struct CliContext {
    config: VeapConfig,
    client: ObjectClient,
    runtime: Runtime,
}

impl CliContext {
    /// Create a context talking HTTP to the configured server
    pub fn new(config: VeapConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config.server.url, config.server.timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a context over an existing transport
    pub fn with_transport(
        config: VeapConfig,
        transport: Arc<dyn VeapTransport>,
    ) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to start runtime: {}", e)))?;
        Ok(Self {
            config,
            client: ObjectClient::new(transport),
            runtime,
        })
    }

    pub fn config(&self) -> &VeapConfig {
        &self.config
    }

    /// Execute a command and return its complete output.
    ///
    /// Streaming commands return every frame, one after another.
    pub fn execute(&self, command: &Commands) -> Result<String, ClientError> {
        let mut frames: Vec<String> = Vec::new();
        let mut collect = |frame: &str| frames.push(frame.to_string());
        let last = self.execute_streaming(command, &mut collect)?;
        if !last.is_empty() {
            frames.push(last);
        }
        Ok(frames.join("\n"))
    }

    /// Execute a command, handing each frame of `monitor` and `watch` to
    /// `emit` as soon as it is rendered. Returns the final output.
    pub fn execute_streaming(
        &self,
        command: &Commands,
        emit: &mut dyn FnMut(&str),
    ) -> Result<String, ClientError> {
        match command {
            Commands::Clean { path } => Ok(clean_path(path)),
            Commands::Resolve { base, path } => Ok(resolve_path(base, path)),
            Commands::Browse { address, format } => {
                let format = OutputFormat::parse(format)?;
                let object = self.runtime.block_on(self.client.fetch(address))?;
                match format {
                    OutputFormat::Text => Ok(format_object_text(&object)),
                    OutputFormat::Json => {
                        let links: Vec<_> = object
                            .navigable_links()
                            .into_iter()
                            .map(|link| {
                                let target = object.resolve(&link.href);
                                json!({
                                    "href": link.href,
                                    "rel": link.rel,
                                    "title": link.title,
                                    "target": target,
                                })
                            })
                            .collect();
                        let view = json!({
                            "address": object.address,
                            "title": object.title,
                            "description": object.description,
                            "variable": object.has_process_value(),
                            "properties": object.properties,
                            "links": links,
                        });
                        to_json(&view)
                    }
                }
            }
            Commands::Read { address, format } => {
                let format = OutputFormat::parse(format)?;
                let pv = self.runtime.block_on(self.client.read_pv(address))?;
                match format {
                    OutputFormat::Text => {
                        let live = LiveValue {
                            pv: Some(pv),
                            ..LiveValue::default()
                        };
                        Ok(format_live_value_text(address, &live))
                    }
                    OutputFormat::Json => to_json(&pv),
                }
            }
            Commands::Write { address, value } => {
                let written = self.runtime.block_on(async {
                    let current = self.client.read_pv(address).await?;
                    let value = parse_value_for(&current.value, value)?;
                    self.client.write_pv(address, value.clone()).await?;
                    Ok::<_, ClientError>(value)
                })?;
                info!(address = %address, "Value written");
                Ok(format!("Wrote {} to {}", pretty_value(&written), address))
            }
            Commands::Monitor {
                address,
                cycle_ms,
                updates,
                format,
            } => {
                let format = OutputFormat::parse(format)?;
                let cycle = positive_cycle(
                    cycle_ms.map_or(self.config.polling.cycle(), Duration::from_millis),
                )?;
                positive_count("updates", updates.map(|n| n as u64))?;
                self.runtime
                    .block_on(self.monitor(address, cycle, *updates, format, emit))
            }
            Commands::Watch {
                points,
                cycle_ms,
                cycles,
                format,
            } => {
                let format = OutputFormat::parse(format)?;
                let cycle = positive_cycle(
                    cycle_ms.map_or(self.config.polling.watch_cycle(), Duration::from_millis),
                )?;
                positive_count("cycles", *cycles)?;
                let registry = Arc::new(WatchRegistry::new(Arc::clone(self.client.transport())));
                self.populate_registry(&registry, points)?;
                if registry.is_empty() {
                    return Ok(format_watch_list_text(&[]));
                }
                self.runtime
                    .block_on(Self::watch(registry, cycle, *cycles, format, emit))
            }
            Commands::Info => {
                let version = self.runtime.block_on(self.client.server_version())?;
                Ok(format!(
                    "Server: {}\nVersion: {}",
                    self.config.server.url, version
                ))
            }
            Commands::Diagnostics => {
                let log = self.runtime.block_on(self.client.diagnostics())?;
                Ok(format_log_text(&log))
            }
            Commands::Refresh => {
                self.runtime.block_on(self.client.refresh())?;
                info!(server = %self.config.server.url, "Server refresh requested");
                Ok("Refresh requested".to_string())
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| ClientError::Config(format!("Failed to render configuration: {}", e))),
        }
    }

    async fn monitor(
        &self,
        address: &str,
        cycle: Duration,
        updates: Option<usize>,
        format: OutputFormat,
        emit: &mut dyn FnMut(&str),
    ) -> Result<String, ClientError> {
        let mut poller = LiveValuePoller::start(
            Arc::clone(self.client.transport()),
            address,
            PollerConfig { cycle },
        );
        let mut rx = poller.subscribe();
        let mut count = 0usize;
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let live = rx.borrow_and_update().clone();
                    let frame = match format {
                        OutputFormat::Text => format_live_value_text(address, &live),
                        OutputFormat::Json => to_json(&live)?,
                    };
                    emit(&frame);
                    count += 1;
                    if updates.map_or(false, |n| count >= n) {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        poller.stop();
        Ok(String::new())
    }

    async fn watch(
        registry: Arc<WatchRegistry>,
        cycle: Duration,
        cycles: Option<u64>,
        format: OutputFormat,
        emit: &mut dyn FnMut(&str),
    ) -> Result<String, ClientError> {
        let mut service = WatchService::start(Arc::clone(&registry), cycle);
        let mut reports = service.subscribe();
        loop {
            tokio::select! {
                changed = reports.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let completed = reports.borrow_and_update().cycle;
                    let frame = match format {
                        OutputFormat::Text => format_watch_list_text(&registry.points()),
                        OutputFormat::Json => to_json(&registry.views())?,
                    };
                    emit(&frame);
                    if cycles.map_or(false, |n| completed >= n) {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        service.stop();
        Ok(String::new())
    }

    /// Configured entries first, then the command-line points.
    fn populate_registry(
        &self,
        registry: &WatchRegistry,
        points: &[String],
    ) -> Result<(), ClientError> {
        for entry in &self.config.watch {
            if let Err(e) = registry.add(entry.display_name(), entry.address.clone()) {
                warn!(address = %entry.address, error = %e, "Skipping configured data point");
            }
        }
        for point in points {
            let (name, address) = parse_watch_point(point)?;
            registry.add(name, address)?;
        }
        Ok(())
    }
}

/// Parse `name=address` or a bare `address`.
pub fn parse_watch_point(point: &str) -> Result<(String, Address), ClientError> {
    let (name, address) = match point.split_once('=') {
        Some((name, address)) => (name.trim(), address.trim()),
        None => (point.trim(), point.trim()),
    };
    if !address.starts_with('/') {
        return Err(ClientError::InvalidValue(format!(
            "data point address must be absolute: {}",
            address
        )));
    }
    let name = if name.is_empty() { address } else { name };
    Ok((name.to_string(), address.to_string()))
}

fn positive_cycle(cycle: Duration) -> Result<Duration, ClientError> {
    if cycle.is_zero() {
        return Err(ClientError::InvalidValue(
            "cycle must be greater than zero".to_string(),
        ));
    }
    Ok(cycle)
}

/// A requested stop count must allow at least one frame.
fn positive_count(name: &str, count: Option<u64>) -> Result<(), ClientError> {
    if count == Some(0) {
        return Err(ClientError::InvalidValue(format!(
            "--{} must be greater than zero",
            name
        )));
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::malformed(format!("Failed to encode output: {}", e)))
}
