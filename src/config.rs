//! # Configuration Source
//!
//! The resolver needs exactly one value from configuration: `repo_path`, the
//! cache root under which every clone lives. The logging setup additionally
//! reads `logging.output_file`. Both come from a YAML document:
//!
//! ```yaml
//! repo_path: /var/cache/social-cr/repos
//! logging:
//!   output_file: /var/log/social-cr.log
//! ```
//!
//! Configuration is reached through the `ConfigSource` trait so the resolver
//! can be handed a file-backed source in production and an in-memory `Config`
//! in tests. `FileConfigSource` reads its file once and keeps the result for
//! the lifetime of the process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Location of the configuration file relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";

const REPO_PATH_HINT: &str = "Add 'repo_path: <directory>' to the configuration file";

/// Settings read from the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which all cached clones are stored
    pub repo_path: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the logging collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// File receiving debug-level log records
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

impl Config {
    /// Create a configuration rooted at `repo_path` with default logging
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parse and validate a YAML configuration document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| Error::Configuration {
                message: e.to_string(),
                hint: Some(REPO_PATH_HINT.to_string()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Configuration {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: Some(format!(
                "Create {} with a 'repo_path:' entry",
                path.display()
            )),
        })?;
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.repo_path.as_os_str().is_empty() {
            return Err(Error::Configuration {
                message: "repo_path is empty".to_string(),
                hint: Some(REPO_PATH_HINT.to_string()),
            });
        }
        Ok(())
    }
}

/// Supplies configuration to the resolver
pub trait ConfigSource: Send + Sync {
    /// Return the current configuration, or `Error::Configuration` when it
    /// is missing or unusable.
    fn get_config(&self) -> Result<Config>;
}

impl ConfigSource for Config {
    fn get_config(&self) -> Result<Config> {
        self.validate()?;
        Ok(self.clone())
    }
}

/// A `ConfigSource` backed by a YAML file, loaded on first use
#[derive(Debug)]
pub struct FileConfigSource {
    path: PathBuf,
    cached: OnceLock<Config>,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigSource {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigSource for FileConfigSource {
    fn get_config(&self) -> Result<Config> {
        if let Some(config) = self.cached.get() {
            return Ok(config.clone());
        }

        // Failed loads are not cached, so a later call can pick up a fixed file
        let config = Config::load(&self.path)?;
        Ok(self.cached.get_or_init(|| config).clone())
    }
}
