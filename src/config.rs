//! Application settings.
//!
//! This module loads the tool's settings from TOML configuration files and
//! supplies defaults when no configuration is present. Every field is
//! optional; missing fields fall back to their defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! base_dir = "./filenest"
//! mapping_file = "fileExtensions.json"
//! log_file = "filenest.log"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur during configuration loading.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings controlling where the tool operates and how it logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory all file operations are sandboxed to.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Name of the extension mapping document inside the base directory.
    #[serde(default = "default_mapping_file")]
    pub mapping_file: String,

    /// Optional log file; logging stays console-only when unset.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./filenest")
}

fn default_mapping_file() -> String {
    "fileExtensions.json".to_string()
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filenestrc.toml` in the current directory
    /// 3. Look for `~/.config/filenest/config.toml` in home directory
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        // If explicitly specified, load from that path
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        // Try current directory
        let local_config = PathBuf::from(".filenestrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        // Try home directory
        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filenest")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        // Fall back to defaults
        Ok(Self::default())
    }

    /// Load settings from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            mapping_file: default_mapping_file(),
            log_file: None,
        }
    }
}
