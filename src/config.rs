use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::memory::lock::LockOptions;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MnemoConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub scoring: ScoringConfig,
    pub prune: PruneConfig,
    pub summarize: SummarizeConfig,
    pub maintenance: MaintenanceConfig,
    pub lock: LockConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub log_path: String,
    pub index_path: String,
}

/// Retrieval weights. Each signal is normalized to `[0,1]` before weighting;
/// `half_life_days` parameterizes the recency signal rather than weighting it.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub scope: f64,
    pub tag: f64,
    pub recency: f64,
    pub importance: f64,
    pub text: f64,
    pub half_life_days: f64,
    /// Applied when a query carries no limit; 0 means unlimited.
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PruneConfig {
    /// Top-ranked items per scope that are never touched by aging.
    pub max_per_scope: usize,
    pub delete_older_than_days: f64,
    pub compress_older_than_days: f64,
    pub dedupe: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SummarizeConfig {
    pub max_content_length: usize,
    pub older_than_days: f64,
}

/// Thresholds for the log health check.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Valid lines per latest item at which compaction is recommended.
    pub max_line_ratio: f64,
    /// Minimum valid lines before the ratio is meaningful at all.
    pub min_lines: usize,
    pub max_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LockConfig {
    pub timeout_ms: u64,
    pub stale_ms: u64,
    pub retry_delay_ms: u64,
}

impl Default for MnemoConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            scoring: ScoringConfig::default(),
            prune: PruneConfig::default(),
            summarize: SummarizeConfig::default(),
            maintenance: MaintenanceConfig::default(),
            lock: LockConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8391,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_mnemo_dir();
        Self {
            log_path: dir.join("memory.jsonl").to_string_lossy().into_owned(),
            index_path: dir.join("index.json").to_string_lossy().into_owned(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scope: 0.30,
            tag: 0.25,
            recency: 0.20,
            importance: 0.15,
            text: 0.10,
            half_life_days: 30.0,
            default_limit: 20,
        }
    }
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            max_per_scope: 100,
            delete_older_than_days: 180.0,
            compress_older_than_days: 30.0,
            dedupe: true,
        }
    }
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            max_content_length: 400,
            older_than_days: 14.0,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_line_ratio: 3.0,
            min_lines: 100,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            stale_ms: 30_000,
            retry_delay_ms: 50,
        }
    }
}

impl LockConfig {
    pub fn options(&self) -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            stale_after: Duration::from_millis(self.stale_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Returns `~/.mnemo/`
pub fn default_mnemo_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".mnemo")
}

/// Returns the default config file path: `~/.mnemo/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mnemo_dir().join("config.toml")
}

impl MnemoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MNEMO_LOG, MNEMO_INDEX,
    /// MNEMO_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMO_LOG") {
            self.storage.log_path = val;
        }
        if let Ok(val) = std::env::var("MNEMO_INDEX") {
            self.storage.index_path = val;
        }
        if let Ok(val) = std::env::var("MNEMO_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the log path, expanding `~` if needed.
    pub fn resolved_log_path(&self) -> PathBuf {
        expand_tilde(&self.storage.log_path)
    }

    /// Resolve the index path, expanding `~` if needed.
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_tilde(&self.storage.index_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
