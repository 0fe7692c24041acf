//! Application configuration read from `lodging-tax.toml`.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "lodging_tax.db"
//!
//! [logging]
//! level = "debug"
//! file = "lodging-tax.log"
//! ```
//!
//! Every table and field is optional. Command-line flags override what the
//! file says.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lodging_tax_core::DbConfig;
use serde::Deserialize;
use tracing::debug;

/// Looked up in the working directory when no path is given.
pub const DEFAULT_FILE: &str = "lodging-tax.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Log file, appended to alongside stdout.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    /// Read the configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_FILE`] is used
    /// when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        debug!(path = %path.display(), backend = %config.database.backend, "loaded configuration");
        Ok(config)
    }
}
