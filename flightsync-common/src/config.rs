//! Bootstrap configuration loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `FLIGHTSYNC_CONFIG` environment variable
//! 3. `~/.config/flightsync/config.toml` (platform config dir)
//! 4. Built-in defaults (no file is not an error)
//!
//! An explicitly named file (priority 1 or 2) that cannot be read is an
//! error; a missing default file only logs a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "FLIGHTSYNC_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Resolver tuning (optional)
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Flight data providers, queried in declaration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Conflict resolver tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Confidences closer than this are considered tied
    #[serde(default = "default_confidence_epsilon")]
    pub confidence_epsilon: f64,

    /// Include agreeing fields in the conflict list
    #[serde(default)]
    pub report_agreements: bool,

    /// Score penalty per unit of conflicting-field fraction (0.0-1.0)
    #[serde(default = "default_conflict_penalty")]
    pub conflict_penalty: f64,

    /// Score penalty per unit of manual-review fraction (0.0-1.0)
    #[serde(default = "default_manual_review_penalty")]
    pub manual_review_penalty: f64,

    /// Weight of authority share versus recency in per-source scores (0.0-1.0)
    #[serde(default = "default_authority_weight")]
    pub authority_weight: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            confidence_epsilon: default_confidence_epsilon(),
            report_agreements: false,
            conflict_penalty: default_conflict_penalty(),
            manual_review_penalty: default_manual_review_penalty(),
            authority_weight: default_authority_weight(),
        }
    }
}

impl ResolverSettings {
    /// Clamp every tunable into its valid range, warning on each correction
    pub fn validated(self) -> Self {
        let defaults = Self::default();

        let confidence_epsilon = if self.confidence_epsilon.is_finite()
            && (0.0..0.5).contains(&self.confidence_epsilon)
        {
            self.confidence_epsilon
        } else {
            warn!(
                value = self.confidence_epsilon,
                "resolver.confidence_epsilon out of range [0, 0.5), using default"
            );
            defaults.confidence_epsilon
        };

        Self {
            confidence_epsilon,
            report_agreements: self.report_agreements,
            conflict_penalty: unit_interval("conflict_penalty", self.conflict_penalty, defaults.conflict_penalty),
            manual_review_penalty: unit_interval(
                "manual_review_penalty",
                self.manual_review_penalty,
                defaults.manual_review_penalty,
            ),
            authority_weight: unit_interval("authority_weight", self.authority_weight, defaults.authority_weight),
        }
    }
}

fn unit_interval(key: &str, value: f64, default: f64) -> f64 {
    if value.is_nan() {
        warn!(key, "resolver setting is NaN, using default {}", default);
        return default;
    }
    if !(0.0..=1.0).contains(&value) {
        warn!(key, value, "resolver setting clamped into [0, 1]");
    }
    value.clamp(0.0, 1.0)
}

/// Provider backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// JSON-over-HTTP flight status API
    Http,
    /// Observations recorded in a local JSON file
    Fixture,
}

/// One `[[providers]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name, becomes the observation source id
    pub name: String,

    pub kind: ProviderKind,

    /// Base URL (required for `http`)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Fixture file (required for `fixture`)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Per-fetch deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// API key (environment `FLIGHTSYNC_<NAME>_API_KEY` takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Client-side rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Confidence assigned to fields whose payload carries none
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Environment variable overriding this provider's API key
    ///
    /// `flight-aware` → `FLIGHTSYNC_FLIGHT_AWARE_API_KEY`
    pub fn api_key_env_var(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("FLIGHTSYNC_{}_API_KEY", name)
    }

    /// Check required keys for the provider kind
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("provider name must not be empty".to_string()));
        }

        if self.timeout_ms == 0 {
            return Err(Error::Config(format!(
                "provider '{}': timeout_ms must be greater than zero",
                self.name
            )));
        }

        if self.requests_per_second == Some(0) {
            return Err(Error::Config(format!(
                "provider '{}': requests_per_second must be greater than zero",
                self.name
            )));
        }

        match self.kind {
            ProviderKind::Http if self.endpoint.is_none() => Err(Error::Config(format!(
                "provider '{}': http providers require an endpoint",
                self.name
            ))),
            ProviderKind::Fixture if self.path.is_none() => Err(Error::Config(format!(
                "provider '{}': fixture providers require a path",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_confidence_epsilon() -> f64 {
    1e-9
}

fn default_conflict_penalty() -> f64 {
    0.25
}

fn default_manual_review_penalty() -> f64 {
    1.0
}

fn default_authority_weight() -> f64 {
    0.7
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_base_confidence() -> f64 {
    0.8
}

fn default_enabled() -> bool {
    true
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flightsync").join("config.toml"))
}

/// Resolve which config file to load, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config dir, only if present
    default_config_path().filter(|path| path.exists())
}

/// Parse a TOML config document and validate provider entries
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    let mut config: TomlConfig = toml::from_str(content)?;

    for provider in &config.providers {
        provider.validate()?;
    }

    config.resolver = config.resolver.validated();
    Ok(config)
}

/// Load and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    parse_toml_config(&content)
}

/// Load the resolved config file, falling back to defaults when none exists
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            load_toml_config(&path)
        }
        None => {
            warn!("No config file found, using built-in defaults (no providers configured)");
            Ok(TomlConfig::default())
        }
    }
}
