//! Engine configuration.
//!
//! [`RouterConfig`] is plain serde data with defaults for every field, so a
//! config file only needs the keys it changes. With the `config-loader`
//! feature, [`load_config`] reads RON, TOML or JSON, picking the format from
//! the file extension.

use serde::{Deserialize, Serialize};

/// Order in which network discovery visits routers. Does not affect which
/// routers end up in a network, only the ring's enumeration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    #[default]
    BreadthFirst,
    DepthFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub traversal: Traversal,
    /// Capacity of the engine's event log.
    pub event_capacity: usize,
    /// Drained pending actions kept for debugging. 0 disables history.
    pub action_history: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            traversal: Traversal::BreadthFirst,
            event_capacity: 1024,
            action_history: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[cfg(feature = "config-loader")]
pub use loader::{ConfigError, ConfigFormat, detect_format, load_config, parse_config};

#[cfg(feature = "config-loader")]
mod loader {
    use super::RouterConfig;
    use std::path::{Path, PathBuf};

    /// Errors that can occur while loading a config file.
    #[derive(Debug, thiserror::Error)]
    pub enum ConfigError {
        #[error("unsupported format for file: {file}")]
        UnsupportedFormat { file: PathBuf },

        #[error("parse error in {file}: {detail}")]
        Parse { file: PathBuf, detail: String },

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }

    /// Supported config file formats.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConfigFormat {
        Ron,
        Toml,
        Json,
    }

    /// Detect the format of a file from its extension.
    pub fn detect_format(path: &Path) -> Result<ConfigFormat, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Ok(ConfigFormat::Ron),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                file: path.to_path_buf(),
            }),
        }
    }

    /// Parse config text in a known format. `origin` is only used in errors.
    pub fn parse_config(
        content: &str,
        format: ConfigFormat,
        origin: &Path,
    ) -> Result<RouterConfig, ConfigError> {
        let parse_err = |detail: String| ConfigError::Parse {
            file: origin.to_path_buf(),
            detail,
        };
        match format {
            ConfigFormat::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))
            }
        }
    }

    /// Read and parse a config file.
    pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let config = parse_config(&content, format, path)?;
        tracing::debug!(file = %path.display(), ?config, "loaded router config");
        Ok(config)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
