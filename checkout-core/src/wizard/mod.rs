//! Five-step checkout wizard.
//!
//! Payment method → Car inspection → Delivery → Additional services → Payment.
//! Steps are advanced only by explicit [`WizardEvent`]s passed to
//! [`CheckoutWizard::dispatch`]; the financing calculator shown in the first
//! step never advances anything.

mod checkout;
mod events;
mod steps;

pub use checkout::{CheckoutWizard, FinancingPanel, WizardError, DEFAULT_APPROVAL_DELAY};
pub use events::{WizardEffect, WizardEvent};
pub use steps::CheckoutSteps;
