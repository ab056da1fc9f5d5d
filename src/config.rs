use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration, whole_days};
use crate::rates::CurrencyCode;
use crate::source::{RetryPolicy, ECB_BASE_URL};

/// Resumed syncs must overlap the previous run by at least this much to
/// rebuild a carry-forward window across weekends and holidays.
pub const MIN_LOOKBACK_DAYS: u32 = 7;

fn default_pivot_currency() -> CurrencyCode {
    CurrencyCode::eur()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_lookback() -> Duration {
    Duration::from_secs(u64::from(MIN_LOOKBACK_DAYS) * 24 * 60 * 60)
}

fn default_state_file() -> PathBuf {
    PathBuf::from("ecbrates-state.json")
}

fn default_base_url() -> String {
    ECB_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root of the SDMX `EXR` dataflow.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_request_timeout(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSONL file for emitted records. Records go to stdout when unset.
    pub path: Option<PathBuf>,

    /// Append to `path` instead of replacing it.
    pub append: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Currency every published rate is quoted against.
    #[serde(default = "default_pivot_currency")]
    pub pivot_currency: CurrencyCode,

    /// Currencies (ISO 4217) to fetch and cross.
    pub currencies: Vec<CurrencyCode>,

    /// First day of the first sync.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Last day to sync. Defaults to today.
    pub end_date: Option<NaiveDate>,

    /// Overlap with the previous run when resuming from a checkpoint.
    #[serde(
        default = "default_lookback",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub lookback: Duration,

    /// Checkpoint file. If relative, resolved from the config file location.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pivot_currency: default_pivot_currency(),
            currencies: Vec::new(),
            start_date: default_start_date(),
            end_date: None,
            lookback: default_lookback(),
            state_file: default_state_file(),
            output: OutputConfig::default(),
            source: SourceConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn lookback_days(&self) -> u32 {
        whole_days(self.lookback)
    }

    /// Check the settings a sync depends on.
    pub fn validate(&self) -> Result<()> {
        if self.currencies.is_empty() {
            anyhow::bail!("At least one currency must be configured");
        }
        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                anyhow::bail!(
                    "end_date {end_date} is before start_date {}",
                    self.start_date
                );
            }
        }
        if self.lookback_days() < MIN_LOOKBACK_DAYS {
            anyhow::bail!(
                "lookback must be at least {MIN_LOOKBACK_DAYS} days to cover weekends and holidays"
            );
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    fn resolve_path(path: &Path, config_dir: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_dir.join(path)
        }
    }
}

/// Loaded configuration with paths resolved against the config directory.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub state_file: PathBuf,
    pub output_path: Option<PathBuf>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./ecbrates.toml` if it exists in current directory
/// 2. `~/.config/ecbrates/ecbrates.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("ecbrates.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("ecbrates").join("ecbrates.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Resolve paths of an in-memory config against `config_dir`.
    pub fn from_config(config: Config, config_dir: &Path) -> Self {
        let state_file = Config::resolve_path(&config.state_file, config_dir);
        let output_path = config
            .output
            .path
            .as_deref()
            .map(|path| Config::resolve_path(path, config_dir));
        Self {
            config,
            state_file,
            output_path,
        }
    }

    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::from_config(Config::default(), config_dir))
    }
}
