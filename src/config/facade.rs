//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::validation::validate_config;
use super::VeapConfig;
use crate::error::ClientError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> Result<VeapConfig, ClientError> {
        Self::finish(MergeService::load(None))
    }

    /// Load configuration with `path` layered over the global file.
    pub fn load_from_file(path: &Path) -> Result<VeapConfig, ClientError> {
        Self::finish(MergeService::load(Some(path)))
    }

    fn finish(
        loaded: Result<VeapConfig, config::ConfigError>,
    ) -> Result<VeapConfig, ClientError> {
        let config = loaded.map_err(|e| ClientError::Config(e.to_string()))?;
        validate_config(&config).into_result()?;
        Ok(config)
    }
}
