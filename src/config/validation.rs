//! Configuration checks run after loading.

use super::VeapConfig;
use crate::error::ClientError;
use crate::logging::validate_logging_config;
use std::collections::HashSet;

/// Validation result for a loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub checks: Vec<(String, bool)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn add_check(&mut self, description: &str, passed: bool) {
        self.checks.push((description.to_string(), passed));
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn passed_checks(&self) -> usize {
        self.checks.iter().filter(|(_, passed)| *passed).count()
    }

    /// Collapse errors into a single `Config` error.
    pub fn into_result(self) -> Result<(), ClientError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ClientError::Config(self.errors.join("; ")))
        }
    }
}

pub fn validate_config(config: &VeapConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let url_ok = match reqwest::Url::parse(&config.server.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => true,
        Ok(url) => {
            result.add_error(format!(
                "server.url must use http or https, got '{}'",
                url.scheme()
            ));
            false
        }
        Err(e) => {
            result.add_error(format!("server.url '{}' is invalid: {}", config.server.url, e));
            false
        }
    };
    result.add_check("server url", url_ok);

    for (key, value) in [
        ("server.timeout_ms", config.server.timeout_ms),
        ("polling.cycle_ms", config.polling.cycle_ms),
        ("polling.watch_cycle_ms", config.polling.watch_cycle_ms),
    ] {
        if value == 0 {
            result.add_error(format!("{} must be greater than zero", key));
        }
        result.add_check(key, value > 0);
    }

    let logging_ok = match validate_logging_config(&config.logging) {
        Ok(()) => true,
        Err(e) => {
            result.add_error(e.to_string());
            false
        }
    };
    result.add_check("logging", logging_ok);

    let mut seen = HashSet::new();
    for entry in &config.watch {
        if !entry.address.starts_with('/') {
            result.add_error(format!(
                "watch address '{}' must be absolute",
                entry.address
            ));
        } else if !seen.insert(entry.address.as_str()) {
            result.add_warning(format!(
                "watch address '{}' is listed more than once",
                entry.address
            ));
        }
    }

    result
}
