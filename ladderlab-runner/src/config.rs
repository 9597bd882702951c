//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [ladder]
//! pivot_price = 36.50
//! step_pct = 1.97
//! max_deviation_pct = 10.0
//! total_funds = 1000000.0
//! lot_size = 100
//!
//! [data]
//! bars_csv = "bars/601398.csv"
//! ```

use ladderlab_core::{LadderConfig, LadderError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content hash of a configuration.
pub type RunId = String;

/// Errors from reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write config TOML: {0}")]
    Write(#[from] toml::ser::Error),

    #[error("failed to serialize config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ladder: {0}")]
    Ladder(#[from] LadderError),

    #[error("data: {0}")]
    Data(String),
}

/// Seeded random-walk bars, used when no CSV is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticConfig {
    pub seed: u64,
    #[serde(default = "default_bar_count")]
    pub bars: usize,
    /// Defaults to the ladder pivot.
    #[serde(default)]
    pub start_price: Option<f64>,
}

fn default_bar_count() -> usize {
    // One trading day of minute bars.
    240
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bars: default_bar_count(),
            start_price: None,
        }
    }
}

/// Where the bars come from. At most one source may be set; none means
/// default synthetic bars.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default)]
    pub bars_csv: Option<PathBuf>,
    #[serde(default)]
    pub synthetic: Option<SyntheticConfig>,
}

/// Serializable configuration for a single run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub ladder: LadderConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl RunConfig {
    pub fn new(ladder: LadderConfig) -> Self {
        Self {
            ladder,
            data: DataConfig::default(),
        }
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate. A relative `bars_csv` is resolved against
    /// the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(csv), Some(dir)) = (config.data.bars_csv.as_mut(), path.parent()) {
            if csv.is_relative() {
                *csv = dir.join(&*csv);
            }
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ladder.validate()?;
        if self.data.bars_csv.is_some() && self.data.synthetic.is_some() {
            return Err(ConfigError::Data(
                "set either bars_csv or synthetic, not both".into(),
            ));
        }
        if let Some(synthetic) = &self.data.synthetic {
            if synthetic.bars == 0 {
                return Err(ConfigError::Data("synthetic.bars must be at least 1".into()));
            }
            if let Some(p) = synthetic.start_price {
                if !(p.is_finite() && p > 0.0) {
                    return Err(ConfigError::Data(format!(
                        "synthetic.start_price must be positive, got {p}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    ///
    /// Two identical configs share an id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
