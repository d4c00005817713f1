//! Logging System
//!
//! Structured logging implementation using the `tracing` crate. Level, format
//! and destination come from the `[logging]` configuration section, then the
//! `VEAP_WATCH_LOG*` environment variables, then the command line. The
//! environment is folded into `LoggingConfig` before command-line flags are
//! applied, so `init_logging` reads the config alone.

use crate::config::paths::xdg_root::APP_DIR;
use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directives, e.g. `debug` or `veap_watch::poller=trace`
pub const ENV_LOG: &str = "VEAP_WATCH_LOG";
pub const ENV_LOG_FORMAT: &str = "VEAP_WATCH_LOG_FORMAT";
pub const ENV_LOG_OUTPUT: &str = "VEAP_WATCH_LOG_OUTPUT";
pub const ENV_LOG_FILE: &str = "VEAP_WATCH_LOG_FILE";
/// Comma separated `module=level` pairs
pub const ENV_LOG_MODULES: &str = "VEAP_WATCH_LOG_MODULES";

/// Resolve the log file path: the configured file, else the default in the
/// platform state directory.
pub fn resolve_log_file_path(config_file: Option<PathBuf>) -> Result<PathBuf, ClientError> {
    match config_file.filter(|p| !p.as_os_str().is_empty()) {
        Some(p) => Ok(p),
        None => default_log_file_path(),
    }
}

fn default_log_file_path() -> Result<PathBuf, ClientError> {
    let project_dirs = directories::ProjectDirs::from("", "", APP_DIR).ok_or_else(|| {
        ClientError::Config("Could not determine platform state directory for log file".to_string())
    })?;
    let state_dir = project_dirs.state_dir().ok_or_else(|| {
        ClientError::Config("Platform state directory not available for log file".to_string())
    })?;
    Ok(state_dir.join("veap-watch.log"))
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use runtime default
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,

    /// Complete filter directives, e.g. `debug,reqwest=warn`; replaces `level` and `modules`
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

// stdout carries command output
fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
            filter: None,
        }
    }
}

/// Fold the `VEAP_WATCH_LOG*` environment variables into `config`.
pub fn apply_env_overrides(config: &mut LoggingConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from(config: &mut LoggingConfig, lookup: impl Fn(&str) -> Option<String>) {
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(filter) = value(ENV_LOG) {
        config.filter = Some(filter);
    }
    if let Some(format) = value(ENV_LOG_FORMAT) {
        config.format = format;
    }
    if let Some(output) = value(ENV_LOG_OUTPUT) {
        config.output = output;
    }
    if let Some(file) = value(ENV_LOG_FILE) {
        config.file = Some(PathBuf::from(file));
    }
    if let Some(modules) = value(ENV_LOG_MODULES) {
        config.modules.extend(parse_module_levels(&modules));
    }
}

/// Initialize the logging system
///
/// Uses `config` as given; callers layer environment and CLI values into it
/// first (see [`apply_env_overrides`]). `None` means the defaults.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ClientError> {
    if config.map_or(false, |c| !c.enabled) {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
            .map_err(|e| ClientError::Config(format!("Failed to initialize logging: {}", e)));
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = parse_output_destinations(config.map_or("stderr", |c| c.output.as_str()))?;
    let ansi = !output.file && config.map_or(true, |c| c.color);
    let writer = make_writer(&output, config)?;

    let subscriber = Registry::default().with(filter);
    let result = if format == "json" {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()
    };
    result.map_err(|e| ClientError::Config(format!("Failed to initialize logging: {}", e)))
}

fn make_writer(
    output: &OutputDestinations,
    config: Option<&LoggingConfig>,
) -> Result<BoxMakeWriter, ClientError> {
    if output.file {
        let file = open_log_file(config.and_then(|c| c.file.clone()))?;
        return Ok(if output.stderr {
            BoxMakeWriter::new(file.and(std::io::stderr))
        } else {
            BoxMakeWriter::new(file)
        });
    }
    Ok(match (output.stdout, output.stderr) {
        (true, true) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        (true, false) => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    })
}

fn open_log_file(config_file: Option<PathBuf>) -> Result<Arc<std::fs::File>, ClientError> {
    let log_file = resolve_log_file_path(config_file)?;
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ClientError::Config(format!("Failed to create log directory: {}", e))
        })?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| {
            ClientError::Config(format!("Failed to open log file {:?}: {}", log_file, e))
        })?;
    Ok(Arc::new(file))
}

/// Build the filter from explicit directives, else level plus module levels
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ClientError> {
    if let Some(directives) = config.and_then(|c| c.filter.as_deref()) {
        return EnvFilter::try_new(directives)
            .map_err(|e| ClientError::Config(format!("Invalid log filter: {}", e)));
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("warn");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut directives: Vec<String> = Vec::new();
    if let Some(config) = config {
        directives.extend(
            config
                .modules
                .iter()
                .map(|(module, module_level)| format!("{}={}", module, module_level)),
        );
    }

    let mut filter = EnvFilter::new(level);
    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ClientError::Config(format!("Invalid log directive: {}", e)))?,
        );
    }
    Ok(filter)
}

fn parse_module_levels(pairs: &str) -> Vec<(String, String)> {
    pairs
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(module, level)| (module.trim().to_string(), level.trim().to_string()))
        .collect()
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, ClientError> {
    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(ClientError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}

/// Output destinations
#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ClientError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(ClientError::Config(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}

/// Check a logging section without installing anything.
pub fn validate_logging_config(config: &LoggingConfig) -> Result<(), ClientError> {
    const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
    if !LEVELS.contains(&config.level.to_ascii_lowercase().as_str()) {
        return Err(ClientError::Config(format!(
            "Invalid log level: {}",
            config.level
        )));
    }
    if config.format != "json" && config.format != "text" {
        return Err(ClientError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            config.format
        )));
    }
    if let Some(directives) = &config.filter {
        EnvFilter::try_new(directives)
            .map_err(|e| ClientError::Config(format!("Invalid log filter: {}", e)))?;
    }
    parse_output_destinations(&config.output).map(|_| ())
}
