use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The five checkout steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKey {
    Payment,
    Inspection,
    Delivery,
    AdditionalServices,
    FinalPayment,
}

impl StepKey {
    pub const ALL: [StepKey; 5] = [
        StepKey::Payment,
        StepKey::Inspection,
        StepKey::Delivery,
        StepKey::AdditionalServices,
        StepKey::FinalPayment,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Payment => 0,
            Self::Inspection => 1,
            Self::Delivery => 2,
            Self::AdditionalServices => 3,
            Self::FinalPayment => 4,
        }
    }

    pub fn next(&self) -> Option<StepKey> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Inspection => "inspection",
            Self::Delivery => "delivery",
            Self::AdditionalServices => "additional-services",
            Self::FinalPayment => "final-payment",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Payment => "Payment method",
            Self::Inspection => "Car inspection",
            Self::Delivery => "Delivery",
            Self::AdditionalServices => "Additional services",
            Self::FinalPayment => "Payment",
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Locked,
    Active,
    Completed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Financing,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Financing => "financing",
            Self::BankTransfer => "bank-transfer",
        }
    }
}

/// A home-delivery coordinate picked on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeliveryChoice {
    Pickup { store_id: String },
    Home { location: GeoPoint },
}

/// Optional extras offered in the additional-services step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKey {
    MechanicalInsurance,
    ExtendedWarranty,
    Registration,
    FullTank,
}

impl ServiceKey {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MechanicalInsurance => "Mechanical Insurance - 1 Year",
            Self::ExtendedWarranty => "Extended warranty",
            Self::Registration => "Registration and number plates",
            Self::FullTank => "Full tank",
        }
    }
}

/// Result of creating an inspection payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionSession {
    pub checkout_url: String,
}
