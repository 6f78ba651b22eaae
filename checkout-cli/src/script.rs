//! Walkthrough scripts: a TOML list of steps replayed through a
//! [`CheckoutSession`](checkout_core::CheckoutSession).
//!
//! ```toml
//! car = "demo-octavia-1"
//! zipcode = "1010"
//!
//! [[steps]]
//! calculator = { product = "regular-loan", months = 48, down_payment = 30 }
//!
//! [[steps]]
//! event = { event = "select-payment-method", method = "financing" }
//!
//! [[steps]]
//! wait_secs = 11
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use checkout_core::{FinancingProduct, WizardEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkthroughScript {
    /// Car to load before the first step. The `--car` flag overrides it.
    pub car: Option<String>,
    /// Zipcode passed when loading charges.
    pub zipcode: Option<String>,
    pub steps: Vec<ScriptStep>,
}

/// One step. Its parts run in field order: calculator changes, the event,
/// the inspection payment, then the wait.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptStep {
    pub calculator: Option<CalculatorAction>,
    pub event: Option<WizardEvent>,
    /// Start the hosted inspection payment for the loaded car.
    pub pay_inspection: bool,
    /// Sleep, then apply whatever the session queued meanwhile.
    pub wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorAction {
    pub product: Option<FinancingProduct>,
    pub months: Option<u32>,
    pub down_payment: Option<u32>,
}

impl WalkthroughScript {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid walkthrough script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read script '{}'", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("cannot parse script '{}'", path.display()))
    }
}

impl ScriptStep {
    /// Short label for printed reports.
    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if self.calculator.is_some() {
            parts.push("calculator".to_string());
        }
        if let Some(event) = &self.event {
            parts.push(event.name().to_string());
        }
        if self.pay_inspection {
            parts.push("pay-inspection".to_string());
        }
        if let Some(secs) = self.wait_secs {
            parts.push(format!("wait {secs}s"));
        }
        if parts.is_empty() {
            "noop".to_string()
        } else {
            parts.join(" + ")
        }
    }
}
