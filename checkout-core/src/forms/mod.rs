//! Customer-entered forms and their validation.
//!
//! Validators never stop at the first problem: every failing field is
//! reported as a [`FieldError`] so the caller can flag them all at once.

mod billing_address;
mod financing_application;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use billing_address::{AccountType, BillingAddressForm};
pub use financing_application::{
    FinancingApplication, FinancingApplicationForm, PHONE_COUNTRY_PREFIX,
};

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Collects field errors while a form is checked.
#[derive(Debug, Default)]
pub(crate) struct FieldChecks {
    errors: Vec<FieldError>,
}

impl FieldChecks {
    /// Value must be non-blank and at least `min` characters once trimmed.
    pub(crate) fn min_len(
        &mut self,
        field: &str,
        value: &str,
        min: usize,
    ) -> bool {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, "is required");
            false
        } else if value.chars().count() < min {
            self.fail(field, format!("must be at least {min} characters"));
            false
        } else {
            true
        }
    }

    pub(crate) fn fail(
        &mut self,
        field: &str,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError::new(field, message));
    }

    pub(crate) fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
