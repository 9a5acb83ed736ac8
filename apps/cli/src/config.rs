//! # CLI Configuration
//!
//! Settings for the `kitwise` binary.
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. AppConfig::default()                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. TOML file (--config, or <config dir>/kitwise/kitwise.toml)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. KITWISE_* environment variables                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! [store]
//! backend = "sqlite"          # sqlite | json | memory
//! path = "/srv/kitwise/kitwise.db"
//!
//! [sales]
//! amount_tolerance_cents = 1
//! default_tax_rate_bps = 2000
//!
//! [output]
//! pretty = true
//! ```
//!
//! ## Environment Overrides
//! `KITWISE_STORE_BACKEND`, `KITWISE_STORE_PATH`,
//! `KITWISE_AMOUNT_TOLERANCE_CENTS`, `KITWISE_TAX_RATE_BPS`, `KITWISE_PRETTY`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use kitwise_core::{Money, PipelineOptions, TaxRate, DEFAULT_AMOUNT_TOLERANCE_CENTS};

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("No config path available on this platform")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Store Settings
// =============================================================================

/// Where the unified catalog is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// `catalog_snapshots` table in a SQLite file.
    #[default]
    Sqlite,
    /// One JSON document.
    Json,
    /// Process memory only; nothing survives the command.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Json => write!(f, "json"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            "json" | "file" => Ok(StoreBackend::Json),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue(format!(
                "store.backend: '{}'. Valid options: sqlite, json, memory",
                other
            ))),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Store location. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreSettings {
    /// Configured path, or the backend's default file in the data directory.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        let file = match self.backend {
            StoreBackend::Sqlite => "kitwise.db",
            StoreBackend::Json => "kitwise-catalog.json",
            StoreBackend::Memory => return None,
        };
        project_dirs().map(|dirs| dirs.data_dir().join(file))
    }
}

// =============================================================================
// Sales & Output Settings
// =============================================================================

/// `[sales]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSettings {
    /// Accepted gap between line amount and quantity × unit price.
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance_cents: i64,

    /// Tax rate used to show margins (basis points, 2000 = 20%).
    #[serde(default = "default_tax_rate")]
    pub default_tax_rate_bps: u32,
}

fn default_amount_tolerance() -> i64 {
    DEFAULT_AMOUNT_TOLERANCE_CENTS
}

fn default_tax_rate() -> u32 {
    2000
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            amount_tolerance_cents: default_amount_tolerance(),
            default_tax_rate_bps: default_tax_rate(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Pretty-print written JSON documents.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            pretty: default_pretty(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

impl AppConfig {
    /// Loads defaults → file → environment, then validates.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    /// Validates value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sales.amount_tolerance_cents < 0 {
            return Err(ConfigError::InvalidValue(
                "sales.amount_tolerance_cents must not be negative".into(),
            ));
        }

        if self.sales.default_tax_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue(
                "sales.default_tax_rate_bps must be at most 10000".into(),
            ));
        }

        if self.store.backend != StoreBackend::Memory {
            if let Some(path) = &self.store.path {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue("store.path is empty".into()));
                }
            }
        }

        Ok(())
    }

    /// Applies `KITWISE_*` overrides read through `lookup`.
    ///
    /// Unparseable values are errors rather than silently ignored.
    fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("KITWISE_STORE_BACKEND") {
            debug!(backend = %backend, "Overriding store backend from environment");
            self.store.backend = backend.parse()?;
        }

        if let Some(path) = lookup("KITWISE_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(tolerance) = lookup("KITWISE_AMOUNT_TOLERANCE_CENTS") {
            self.sales.amount_tolerance_cents = tolerance
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KITWISE_AMOUNT_TOLERANCE_CENTS".into()))?;
        }

        if let Some(rate) = lookup("KITWISE_TAX_RATE_BPS") {
            self.sales.default_tax_rate_bps = rate
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KITWISE_TAX_RATE_BPS".into()))?;
        }

        if let Some(pretty) = lookup("KITWISE_PRETTY") {
            self.output.pretty = match pretty.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::InvalidValue("KITWISE_PRETTY".into())),
            };
        }

        Ok(())
    }

    /// `<platform config dir>/kitwise.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("kitwise.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pipeline options derived from `[sales]`.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            amount_tolerance: Money::from_cents(self.sales.amount_tolerance_cents),
        }
    }

    /// Tax rate used for margin display.
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.sales.default_tax_rate_bps)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "kitwise", "kitwise")
}

// =============================================================================
// Unit Tests
// =============================================================================
