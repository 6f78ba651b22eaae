use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{FieldChecks, FieldError};

static BIRTH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").expect("valid birth date regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    #[default]
    Consumer,
    Company,
}

/// Billing address collected for bank-transfer purchases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingAddressForm {
    pub account_type: AccountType,
    pub name: String,
    pub surname: String,
    pub telephone: String,

    /// `dd.mm.yyyy`.
    pub birth_date: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,

    /// Required for [`AccountType::Company`] only.
    pub company_id: Option<String>,
    pub company_name: Option<String>,
}

impl BillingAddressForm {
    /// # Errors
    ///
    /// One [`FieldError`] per failing field, in form order.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = FieldChecks::default();

        checks.min_len("name", &self.name, 2);
        checks.min_len("surname", &self.surname, 2);
        checks.min_len("telephone", &self.telephone, 2);

        let birth_date = self.birth_date.trim();
        if birth_date.is_empty() {
            checks.fail("birth_date", "is required");
        } else if !BIRTH_DATE_RE.is_match(birth_date) {
            checks.fail("birth_date", "must be in dd.mm.yyyy format");
        }

        checks.min_len("street", &self.street, 2);
        checks.min_len("house_number", &self.house_number, 1);
        checks.min_len("postal_code", &self.postal_code, 5);
        checks.min_len("city", &self.city, 2);
        checks.min_len("country", &self.country, 1);

        if self.account_type == AccountType::Company {
            checks.min_len("company_id", self.company_id.as_deref().unwrap_or(""), 2);
            checks.min_len("company_name", self.company_name.as_deref().unwrap_or(""), 2);
        }

        checks.finish()
    }
}

impl fmt::Display for BillingAddressForm {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.surname)?;
        if let Some(company) = &self.company_name {
            writeln!(f, "{company}")?;
        }
        writeln!(f, "{} {}", self.street, self.house_number)?;
        write!(f, "{} {}, {}", self.postal_code, self.city, self.country)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn consumer() -> BillingAddressForm {
        BillingAddressForm {
            account_type: AccountType::Consumer,
            name: "Lukas".to_string(),
            surname: "Gruber".to_string(),
            telephone: "+43 660 1234567".to_string(),
            birth_date: "02.11.1990".to_string(),
            street: "Mariahilfer Strasse".to_string(),
            house_number: "7".to_string(),
            postal_code: "10600".to_string(),
            city: "Wien".to_string(),
            country: "AT".to_string(),
            company_id: None,
            company_name: None,
        }
    }

    fn failed_fields(form: &BillingAddressForm) -> Vec<String> {
        form.validate()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn consumer_address_valid() {
        assert_eq!(consumer().validate(), Ok(()));
    }

    #[test]
    fn birth_date_uses_dots() {
        let form = BillingAddressForm {
            birth_date: "02/11/1990".to_string(),
            ..consumer()
        };

        assert_eq!(failed_fields(&form), vec!["birth_date"]);
    }

    #[test]
    fn short_postal_code_rejected() {
        let form = BillingAddressForm {
            postal_code: "1060".to_string(),
            ..consumer()
        };

        assert_eq!(failed_fields(&form), vec!["postal_code"]);
    }

    #[test]
    fn company_requires_company_fields() {
        let form = BillingAddressForm {
            account_type: AccountType::Company,
            ..consumer()
        };

        assert_eq!(failed_fields(&form), vec!["company_id", "company_name"]);
    }

    #[test]
    fn company_with_details_valid() {
        let form = BillingAddressForm {
            account_type: AccountType::Company,
            company_id: Some("FN123456".to_string()),
            company_name: Some("Gruber Logistik GmbH".to_string()),
            ..consumer()
        };

        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn consumer_ignores_company_fields() {
        let form = BillingAddressForm {
            company_id: Some(String::new()),
            ..consumer()
        };

        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn empty_form_lists_required_fields() {
        assert_eq!(
            failed_fields(&BillingAddressForm::default()),
            vec![
                "name",
                "surname",
                "telephone",
                "birth_date",
                "street",
                "house_number",
                "postal_code",
                "city",
                "country",
            ]
        );
    }
}
