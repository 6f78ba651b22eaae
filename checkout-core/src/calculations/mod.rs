//! Money calculations for the checkout.
//!
//! - [`financing`]: monthly installment and quote for the financing products
//! - [`charges`]: order charge breakdown (VAT, services, delivery)

pub mod charges;
pub mod common;
pub mod financing;

pub use charges::{compute_charges, delivery_charge};
pub use financing::{
    compute_monthly_payment, indicative_last_payment, FinancingCalculator, FinancingError,
    FinancingPreset, FinancingQuote, FinancingSelection, FinancingTable,
};
