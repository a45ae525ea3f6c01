//! Command line configuration
//!
//! Precedence, lowest first: built-in defaults, the TOML file given with
//! `--config`, `REPOPRINT_` environment variables, command line flags.
//! Nested keys use `__` in variable names, e.g.
//! `REPOPRINT_INDEXER__BUCKET_SIZE=512`.

use config::{Config, ConfigError, Environment, File};
use repoprint_core::IndexerConfig;
use repoprint_store::RemoverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment variables read as configuration
pub const ENV_PREFIX: &str = "REPOPRINT";

/// Default snapshot file holding the index between runs
pub const DEFAULT_SNAPSHOT: &str = "repoprint.snapshot";

/// Full command line configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Snapshot file the index is loaded from and saved to
    pub snapshot: PathBuf,
    pub indexer: IndexerConfig,
    pub remover: RemoverSettings,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
            indexer: IndexerConfig::default(),
            remover: RemoverSettings::default(),
        }
    }
}

/// Bulk removal throttling
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoverSettings {
    pub workers: usize,
    pub batch_size: usize,
    /// Pause between batches, in milliseconds
    pub wait_ms: u64,
}

impl Default for RemoverSettings {
    fn default() -> Self {
        let defaults = RemoverConfig::default();
        Self {
            workers: defaults.workers,
            batch_size: defaults.batch_size,
            wait_ms: defaults.wait.as_millis() as u64,
        }
    }
}

impl RemoverSettings {
    pub fn to_remover_config(&self) -> RemoverConfig {
        RemoverConfig {
            workers: self.workers,
            batch_size: self.batch_size,
            wait: Duration::from_millis(self.wait_ms),
        }
    }
}

/// Load configuration from an optional file and the process environment
pub fn load(path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    load_with_env(path, environment())
}

/// Load configuration from an optional file and the given environment source
pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<CliConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder.add_source(env).build()?.try_deserialize()
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
