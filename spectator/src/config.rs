use std::{
    io,
    path::{Path, PathBuf},
};

use coordinator::CoordinatorConfig;
use overlay::OverlayConfig;
use serde::{Deserialize, Serialize};
use source_adapter::SourceConfig;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "SPECTATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "spectator.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectatorConfig {
    pub coordinator: CoordinatorConfig,
    pub source: SourceConfig,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

impl SpectatorConfig {
    pub fn from_file(path: &Path) -> Result<SpectatorConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
    }

    /// Reads the file named by `SPECTATOR_CONFIG_PATH`, or `spectator.json`.
    /// Falls back to the defaults when that fails.
    pub fn load() -> SpectatorConfig {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        match SpectatorConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "configuration loaded");
                config
            }
            Err(e) => {
                tracing::warn!("{e}, using defaults");
                SpectatorConfig::default()
            }
        }
    }
}
