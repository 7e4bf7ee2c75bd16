//! Root configuration file (`gotya.toml`): the repository table, cache
//! locations, and default downloader concurrency.

use std::path::Path;

use gotya_schema::Repository;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::paths;

/// Errors loading or saving a [`Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Filesystem error reading or writing the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The file did not parse as valid TOML.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config could not be serialized back to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The `gotya.toml` root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configured index origins, in priority-irrelevant declaration order.
    #[serde(default, rename = "repository")]
    pub repositories: Vec<Repository>,
    /// Downloader concurrency; `None` falls back to `max(2, cpus/2)`.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            concurrency: None,
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields an empty default config so
    /// a fresh `gotya` install doesn't need to pre-create one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for a read failure other than "not
    /// found", or [`ConfigError::Parse`] for malformed TOML.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path).await {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load from the default location, `<gotya_home>/gotya.toml`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub async fn load_default() -> Result<Self, ConfigError> {
        Self::load(&paths::config_path()).await
    }

    /// Atomically persist this config: write to a sibling `.tmp` file,
    /// then rename over the destination.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if the config can't be
    /// serialized, or [`ConfigError::Io`] on a filesystem failure.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, text).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Find a configured repository by name.
    #[must_use]
    pub fn find_repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Remove a configured repository by name, returning whether one was
    /// present.
    pub fn remove_repository(&mut self, name: &str) -> bool {
        let before = self.repositories.len();
        self.repositories.retain(|r| r.name != name);
        self.repositories.len() != before
    }
}
