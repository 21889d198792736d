//! Configuration for keiba-sync.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::pedigree::MAX_GENERATION;

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    /// How long a writer waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_store_path() -> String {
    "data/keiba.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Pedigree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedigreeConfig {
    #[serde(default = "default_max_generation")]
    pub max_generation: u32,
}

fn default_max_generation() -> u32 {
    MAX_GENERATION
}

impl Default for PedigreeConfig {
    fn default() -> Self {
        Self {
            max_generation: default_max_generation(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "keiba_sync=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pedigree: PedigreeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`load`](Self::load), reading `file` instead of the default
    /// `keiba-sync.*` in the working directory.
    pub fn load_from(file: Option<&Path>) -> anyhow::Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("keiba-sync").required(false),
        };

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file_source)
            // Override with environment variables (KEIBA_STORE__PATH, etc.)
            .add_source(
                config::Environment::with_prefix("KEIBA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        let generation = self.pedigree.max_generation;
        if generation == 0 || generation > MAX_GENERATION {
            return Err(SyncError::InvalidArgument(format!(
                "pedigree.max_generation must be in 1..={MAX_GENERATION}, got {generation}"
            )));
        }
        if self.store.path.trim().is_empty() {
            return Err(SyncError::InvalidArgument("store.path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.path, "data/keiba.db");
        assert_eq!(config.store.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.pedigree.max_generation, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"store": {"path": "/tmp/x.db"}}"#).unwrap();
        assert_eq!(config.store.path, "/tmp/x.db");
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.log.filter, "keiba_sync=info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[store]\npath = \"races.db\"\n\n[pedigree]\nmax_generation = 3\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.store.path, "races.db");
        assert_eq!(config.pedigree.max_generation, 3);
        assert_eq!(config.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_out_of_range_generation_rejected() {
        let mut config = AppConfig::default();
        config.pedigree.max_generation = 6;
        assert!(matches!(config.validate(), Err(SyncError::InvalidArgument(_))));
        config.pedigree.max_generation = 0;
        assert!(config.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[pedigree]\nmax_generation = 9\n").unwrap();
        assert!(AppConfig::load_from(Some(&path)).is_err());
    }
}
