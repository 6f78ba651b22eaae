use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{FieldChecks, FieldError};

/// Country calling code prepended to the telephone number on submission.
pub const PHONE_COUNTRY_PREFIX: &str = "+43";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{9,}$").expect("valid phone regex"));

static DOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid date regex"));

/// Raw financing application as typed by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingApplicationForm {
    pub name: String,
    pub surname: String,
    pub telephone_number: String,
    pub email: String,
    pub identification_number: String,

    /// `DD/MM/YYYY`.
    pub date_of_birth: String,
}

/// A validated application, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingApplication {
    pub name: String,
    pub surname: String,

    /// Digits only, prefixed with [`PHONE_COUNTRY_PREFIX`].
    pub telephone_number: String,
    pub email: String,
    pub identification_number: String,
    pub date_of_birth: NaiveDate,
}

impl FinancingApplicationForm {
    /// Validates every field and normalises the result.
    ///
    /// # Errors
    ///
    /// One [`FieldError`] per failing field, in form order.
    pub fn validate(&self) -> Result<FinancingApplication, Vec<FieldError>> {
        let mut checks = FieldChecks::default();

        checks.min_len("name", &self.name, 2);
        checks.min_len("surname", &self.surname, 2);

        let phone: String = self
            .telephone_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if phone.is_empty() {
            checks.fail("telephone_number", "is required");
        } else if !PHONE_RE.is_match(&phone) {
            checks.fail("telephone_number", "must contain at least 9 digits");
        }

        let email = self.email.trim();
        if email.is_empty() {
            checks.fail("email", "is required");
        } else if !EMAIL_RE.is_match(email) {
            checks.fail("email", "is not a valid email address");
        }

        checks.min_len("identification_number", &self.identification_number, 8);

        let dob = self.date_of_birth.trim();
        let date_of_birth = if dob.is_empty() {
            checks.fail("date_of_birth", "is required");
            None
        } else if !DOB_RE.is_match(dob) {
            checks.fail("date_of_birth", "must be in DD/MM/YYYY format");
            None
        } else {
            match NaiveDate::parse_from_str(dob, "%d/%m/%Y") {
                Ok(date) => Some(date),
                Err(_) => {
                    checks.fail("date_of_birth", "is not a real calendar date");
                    None
                }
            }
        };

        checks.finish()?;

        // Checks passed, so the date is present.
        let Some(date_of_birth) = date_of_birth else {
            return Err(vec![FieldError::new("date_of_birth", "is required")]);
        };

        Ok(FinancingApplication {
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            telephone_number: format!("{PHONE_COUNTRY_PREFIX}{phone}"),
            email: email.to_string(),
            identification_number: self.identification_number.trim().to_string(),
            date_of_birth,
        })
    }
}
