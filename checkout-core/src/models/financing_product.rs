use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinancingProduct {
    LowInstallment,
    RegularLoan,
}

impl FinancingProduct {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowInstallment => "low-installment",
            Self::RegularLoan => "regular-loan",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low-installment" => Some(Self::LowInstallment),
            "regular-loan" => Some(Self::RegularLoan),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LowInstallment => "Low instalment",
            Self::RegularLoan => "Regular loan",
        }
    }
}

impl fmt::Display for FinancingProduct {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal payback periods for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PeriodDomain {
    /// An explicit list of month counts, e.g. `[24, 36, 48]`.
    Fixed { months: Vec<u32> },
    /// Every multiple of 12 between `min` and `max` inclusive.
    MultiplesOfTwelve { min: u32, max: u32 },
}

impl PeriodDomain {
    /// Every legal value in ascending order.
    pub fn values(&self) -> Vec<u32> {
        match self {
            Self::Fixed { months } => {
                let mut months = months.clone();
                months.sort_unstable();
                months.dedup();
                months
            }
            Self::MultiplesOfTwelve { min, max } => (*min..=*max).filter(|m| m % 12 == 0).collect(),
        }
    }

    pub fn contains(
        &self,
        months: u32,
    ) -> bool {
        match self {
            Self::Fixed { months: list } => list.contains(&months),
            Self::MultiplesOfTwelve { min, max } => {
                months % 12 == 0 && months >= *min && months <= *max
            }
        }
    }
}

/// Per-product financing constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTerms {
    pub product: FinancingProduct,

    /// Nominal annual interest rate in percent (e.g. `9.50`).
    pub interest_rate: Decimal,

    /// Fee-inclusive annual percentage rate in percent.
    pub apr: Decimal,

    pub period_domain: PeriodDomain,

    /// Initial period of a fresh calculator; must be a legal value.
    pub default_period: u32,

    pub min_down_payment_percent: u32,
    pub max_down_payment_percent: u32,

    /// Share of the loan deferred to a final balloon payment, `0` for a
    /// fully amortizing product.
    pub balloon_fraction: Decimal,
}
