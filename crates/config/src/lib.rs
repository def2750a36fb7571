//! # Updater Configuration
//!
//! Layered configuration, later layers overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. a config file (`--config`, or `updater.toml` in the platform config
//!    directory when present), format chosen by extension,
//! 3. environment variables prefixed `UPDATER_`, with `__` separating nested
//!    keys (`UPDATER_DATABASE__PATH`, `UPDATER_PROCESSING__CONCURRENCY`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APPLICATION: &str = "updater";
const CONFIG_FILE: &str = "updater.toml";
const DATABASE_FILE: &str = "updater.sqlite";
const ENV_PREFIX: &str = "UPDATER_";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub processing: ProcessingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; created (with its parent directory) if missing.
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long to wait on another writer's lock before giving up.
    pub busy_timeout_ms: u64,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE));
        Self {
            path,
            max_connections: 5,
            busy_timeout_ms: 1500,
        }
    }
}
impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Updates in flight at once.
    pub concurrency: usize,
    /// Publish the merged record even if an update changed nothing.
    pub publish_unchanged: bool,
    /// Attempts per update on transient store failures.
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled for each retry after it.
    pub retry_backoff_ms: u64,
}
impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            publish_unchanged: true,
            max_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}
impl ProcessingConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `file` must exist. Without one, `updater.toml` in the
    /// platform config directory is used if it exists.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered [`Figment`] without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(path) = default_file().filter(|path| path.is_file()) {
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Reject values that would leave the updater unable to make progress.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database.max_connections"));
        }
        if self.processing.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("processing.concurrency"));
        }
        if self.processing.max_attempts == 0 {
            exn::bail!(ErrorKind::Invalid("processing.max_attempts"));
        }
        if self.log.level.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("log.level"));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

fn default_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    debug!(path = %path.display(), "loading config file");
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    Ok(figment)
}
