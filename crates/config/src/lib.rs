//! blogstat Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use blogstat_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[query]\ndata_path = \"data/views.json\"").unwrap();
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [query]
//! backend = "clickhouse"
//! url = "http://localhost:8123"
//! database = "analytics"
//! ```
//!
//! See `configs/blogstat.toml` for all available options.

mod error;
mod logging;
mod query;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use query::{DEFAULT_TABLE, QueryConfig, StoreBackend};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Record store configuration
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// A config with no `[query]` section is accepted: the CLI may supply
    /// the dataset with `--data` instead.
    pub fn validate(&self) -> Result<()> {
        if self.query.backend == StoreBackend::Memory && self.query.data_path.is_none() {
            return Ok(());
        }
        self.query.validate()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
