//! Configuration loading from TOML/JSON with environment variable overrides.
//!
//! Reads the config file (TOML by default, JSON when the extension says so)
//! and deserializes into strongly-typed structs. The wallet key and the RPC
//! endpoint come from the environment (`PRIVATE_KEY`, `RPC_URL`), and `MODE`
//! overrides the file's trading mode.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::types::TradingMode;

/// Config file used when neither `--config` nor `CONFIG_FILE` names one.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub const DEFAULT_DATA_API_URL: &str = "https://clob.polymarket.com/markets?limit=100&offset=0";
pub const DEFAULT_CLOB_API_URL: &str = "https://clob.polymarket.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Unsupported config format: {} (expected .toml or .json)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid trading config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Trading thresholds
// ---------------------------------------------------------------------------

/// Static thresholds read by the scanner, sizer and execution loop.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TradingConfig {
    /// Upper bound on wallet capital the bot may allocate.
    pub max_balance_to_use: Decimal,
    pub max_position_per_market: Decimal,
    /// Optional ceiling on the sum of open position sizes.
    pub max_open_exposure: Option<Decimal>,
    pub min_probability_price: Decimal,
    pub max_probability_price: Decimal,
    pub max_time_to_resolution_hours: f64,
    /// Minimum size resting at the best ask.
    pub min_liquidity: Decimal,
    pub min_trade_size: Decimal,
    pub scan_interval_seconds: u64,
    /// Re-open a market/outcome that already has a ledger entry.
    pub allow_scale_in: bool,
    /// Simulated wallet balance for paper mode. `None` uses the balance source.
    pub paper_balance: Option<Decimal>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_balance_to_use: dec!(30),
            max_position_per_market: dec!(5),
            max_open_exposure: None,
            min_probability_price: dec!(0.97),
            max_probability_price: dec!(0.995),
            max_time_to_resolution_hours: 24.0,
            min_liquidity: dec!(1),
            min_trade_size: dec!(1),
            scan_interval_seconds: 60,
            allow_scale_in: true,
            paper_balance: None,
        }
    }
}

impl TradingConfig {
    /// Reject thresholds that would make the filter or sizer meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |p: Decimal| p >= Decimal::ZERO && p <= Decimal::ONE;

        if !in_unit(self.min_probability_price) || !in_unit(self.max_probability_price) {
            return Err(ConfigError::Invalid(
                "probability prices must lie in [0, 1]".to_string(),
            ));
        }
        if self.min_probability_price > self.max_probability_price {
            return Err(ConfigError::Invalid(format!(
                "min_probability_price {} exceeds max_probability_price {}",
                self.min_probability_price, self.max_probability_price
            )));
        }

        let non_negative = [
            ("max_balance_to_use", Some(self.max_balance_to_use)),
            ("max_position_per_market", Some(self.max_position_per_market)),
            ("max_open_exposure", self.max_open_exposure),
            ("min_liquidity", Some(self.min_liquidity)),
            ("min_trade_size", Some(self.min_trade_size)),
            ("paper_balance", self.paper_balance),
        ];
        for (name, value) in non_negative {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(ConfigError::Invalid(format!("{name} must be >= 0, got {v}")));
                }
            }
        }

        if !self.max_time_to_resolution_hours.is_finite() || self.max_time_to_resolution_hours < 0.0 {
            return Err(ConfigError::Invalid(
                "max_time_to_resolution_hours must be a non-negative number".to_string(),
            ));
        }
        if self.scan_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "scan_interval_seconds must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Application config
// ---------------------------------------------------------------------------

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    rpc_url: Option<String>,
    data_api_url: Option<String>,
    clob_api_url: Option<String>,
    mode: Option<TradingMode>,
    trading: TradingConfig,
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub private_key: Option<SecretString>,
    pub rpc_url: String,
    pub data_api_url: String,
    pub clob_api_url: String,
    pub mode: TradingMode,
    pub trading: TradingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            rpc_url: String::new(),
            data_api_url: DEFAULT_DATA_API_URL.to_string(),
            clob_api_url: DEFAULT_CLOB_API_URL.to_string(),
            mode: TradingMode::Paper,
            trading: TradingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML or JSON file and apply environment
    /// overrides. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.to_path_buf() }.into());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let raw: RawConfig = match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) {
            Some(ext) if ext == "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            Some(ext) if ext == "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => return Err(ConfigError::UnsupportedFormat { path: path.to_path_buf() }.into()),
        };

        Self::from_raw(raw)
    }

    /// Resolve which config source to use and load it.
    ///
    /// An explicitly named source (CLI flag, then `CONFIG_FILE`) must exist.
    /// The implicit default may be absent, in which case built-in defaults
    /// plus environment overrides are used.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CONFIG_FILE").ok().map(PathBuf::from));

        if let Some(path) = named {
            let cfg = Self::load(&path)?;
            return Ok((cfg, Some(path)));
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            let cfg = Self::load(&default_path)?;
            return Ok((cfg, Some(default_path)));
        }

        info!(path = DEFAULT_CONFIG_PATH, "No config file found, using defaults");
        let cfg = Self::from_raw(RawConfig::default())?;
        Ok((cfg, None))
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let defaults = AppConfig::default();

        let mode = match std::env::var("MODE") {
            Ok(m) if !m.trim().is_empty() => m.parse::<TradingMode>()?,
            _ => raw.mode.unwrap_or(defaults.mode),
        };

        raw.trading.validate()?;

        Ok(Self {
            private_key: std::env::var("PRIVATE_KEY").ok().map(SecretString::new),
            rpc_url: std::env::var("RPC_URL")
                .ok()
                .or(raw.rpc_url)
                .unwrap_or(defaults.rpc_url),
            data_api_url: raw.data_api_url.unwrap_or(defaults.data_api_url),
            clob_api_url: raw.clob_api_url.unwrap_or(defaults.clob_api_url),
            mode,
            trading: raw.trading,
        })
    }
}
