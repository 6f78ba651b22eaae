//! `checkout.toml` settings.
//!
//! ```toml
//! [backend]
//! backend = "sqlite"
//! connection_string = "marketplace.db"
//! checkout_base_url = "https://pay.example.com"
//!
//! [wizard]
//! approval_delay_secs = 10
//!
//! [financing]
//! preset = "checkout"
//!
//! [logging]
//! level = "info"
//! file = "checkout.log"
//! stdout = true
//! ```
//!
//! Every section and key is optional. `[[financing.products]]` entries, when
//! present, replace the preset table entirely.

use std::path::{Path, PathBuf};
use std::time::Duration;

use checkout_core::wizard::DEFAULT_APPROVAL_DELAY;
use checkout_core::{BackendConfig, FinancingError, FinancingPreset, FinancingTable, ProductTerms};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid financing products: {0}")]
    Financing(#[from] FinancingError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub wizard: WizardSettings,
    pub financing: FinancingSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSettings {
    pub approval_delay_secs: u64,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            approval_delay_secs: DEFAULT_APPROVAL_DELAY.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingSettings {
    pub preset: FinancingPreset,
    pub products: Vec<ProductTerms>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Bare level or full `EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
    /// Append log lines to this file as well.
    pub file: Option<PathBuf>,
    /// Console output, written to stderr.
    pub stdout: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            stdout: true,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        // Reject bad product overrides at load time rather than on first use.
        config.financing_table()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn financing_table(&self) -> Result<FinancingTable, FinancingError> {
        if self.financing.products.is_empty() {
            Ok(FinancingTable::preset(self.financing.preset))
        } else {
            FinancingTable::new(self.financing.products.clone())
        }
    }

    pub fn approval_delay(&self) -> Duration {
        Duration::from_secs(self.wizard.approval_delay_secs)
    }
}
