//! Editor configuration
//!
//! Read from `<config_dir>/parabox-editor/config.ron`. A missing file means
//! defaults; any field left out of the file keeps its default value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Directory name under the platform config and data dirs
pub const APP_DIR: &str = "parabox-editor";
pub const CONFIG_FILE: &str = "config.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory holding `<name>.level` files
    pub levels_dir: PathBuf,
    /// Brotli compress newly saved levels
    pub compress_levels: bool,
    /// Title given to levels created without one
    pub default_title: String,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            levels_dir: default_levels_dir(),
            compress_levels: false,
            default_title: "Untitled".to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

/// `<data_dir>/parabox-editor/levels`, or `./levels` without a data dir
pub fn default_levels_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR).join("levels"))
        .unwrap_or_else(|| PathBuf::from("levels"))
}

/// `<config_dir>/parabox-editor/config.ron`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

impl EditorConfig {
    /// Load the config at `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config as pretty RON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        let contents = ron::ser::to_string_pretty(self, pretty)?;

        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, contents).map_err(io_err)
    }
}
