use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::forms::{BillingAddressForm, FinancingApplicationForm};
use crate::{GeoPoint, PaymentMethod, ServiceKey, StepKey};

/// Every input the checkout wizard reacts to.
///
/// Serialized with an `event` tag so walkthrough scripts can list them:
///
/// ```toml
/// [[steps]]
/// event = { event = "select-payment-method", method = "bank-transfer" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum WizardEvent {
    SelectPaymentMethod {
        method: PaymentMethod,
    },

    /// "I want financing": reveals the application form.
    RequestFinancing,

    SubmitFinancingApplication {
        form: FinancingApplicationForm,
        #[serde(default)]
        consent: bool,
    },

    /// Sent by the session's approval timer.
    FinancingApproved,

    PayInFull,
    DeclineFinancing,

    CompleteBillingAddress {
        form: BillingAddressForm,
    },

    CompleteOrderSummary {
        #[serde(default)]
        terms_accepted: bool,
    },

    ContinueFromInspection,

    SelectPickupStore {
        store_id: String,
    },

    SetHomeDelivery {
        location: GeoPoint,
    },

    ContinueFromDelivery,

    ToggleService {
        service: ServiceKey,
    },

    ContinueFromAdditionalServices,

    SetTermsAccepted {
        accepted: bool,
    },

    ConfirmFinalPayment,

    ToggleExpanded {
        step: StepKey,
    },

    /// Start over: back to the initial state, pending approval cancelled.
    Restart,
}

impl WizardEvent {
    /// Short kebab-case name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectPaymentMethod { .. } => "select-payment-method",
            Self::RequestFinancing => "request-financing",
            Self::SubmitFinancingApplication { .. } => "submit-financing-application",
            Self::FinancingApproved => "financing-approved",
            Self::PayInFull => "pay-in-full",
            Self::DeclineFinancing => "decline-financing",
            Self::CompleteBillingAddress { .. } => "complete-billing-address",
            Self::CompleteOrderSummary { .. } => "complete-order-summary",
            Self::ContinueFromInspection => "continue-from-inspection",
            Self::SelectPickupStore { .. } => "select-pickup-store",
            Self::SetHomeDelivery { .. } => "set-home-delivery",
            Self::ContinueFromDelivery => "continue-from-delivery",
            Self::ToggleService { .. } => "toggle-service",
            Self::ContinueFromAdditionalServices => "continue-from-additional-services",
            Self::SetTermsAccepted { .. } => "set-terms-accepted",
            Self::ConfirmFinalPayment => "confirm-final-payment",
            Self::ToggleExpanded { .. } => "toggle-expanded",
            Self::Restart => "restart",
        }
    }
}

/// Side effects requested by the reducer and carried out by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEffect {
    ScrollIntoView(StepKey),

    /// Deliver [`WizardEvent::FinancingApproved`] after the delay.
    ScheduleApproval(Duration),

    CancelApproval,
    ShowBillingForm,
    ResetFinancingForm,
}
