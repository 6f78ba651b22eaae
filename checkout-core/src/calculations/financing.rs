//! Financing calculator for the checkout payment step.
//!
//! Two products are offered: a fully amortizing **regular loan**, and a
//! **low instalment** loan that defers a fixed share of the loan (the balloon)
//! to a final payment so that only the remainder is amortized monthly.
//!
//! # Monthly payment
//!
//! | Quantity        | Formula |
//! |-----------------|---------|
//! | loan            | `price × (1 − down_payment% / 100)` |
//! | monthly rate r  | `interest_rate / 100 / 12` |
//! | financed        | `loan − loan × balloon_fraction` |
//! | payment         | `financed × r / (1 − (1 + r)^−n)`, rounded to whole units |
//!
//! # Domain correction
//!
//! The payback period and down payment always lie in the domain of the
//! selected product. Changing the product (or setting an off-step value)
//! never fails: the values are snapped to the nearest legal step instead.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use checkout_core::calculations::{FinancingCalculator, FinancingTable};
//! use checkout_core::FinancingProduct;
//!
//! let mut calculator = FinancingCalculator::new(FinancingTable::calculator(), dec!(25000));
//! calculator.select_product(FinancingProduct::RegularLoan).unwrap();
//! calculator.set_down_payment_percent(30);
//! calculator.set_payback_period(48);
//!
//! let quote = calculator.quote();
//! assert_eq!(quote.down_payment_amount, dec!(7500));
//! assert_eq!(quote.loan_amount, dec!(17500));
//! assert_eq!(quote.monthly_payment, dec!(431));
//! ```

use std::collections::HashSet;
use std::fmt;

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{percent_of, round_half_up, round_to_unit};
use crate::{FinancingProduct, PeriodDomain, ProductTerms};

/// Highest down payment any product accepts, in percent.
pub const MAX_DOWN_PAYMENT_PERCENT: u32 = 90;

/// Down-payment slider step, in percent.
pub const DOWN_PAYMENT_STEP: u32 = 10;

/// Longest payback period a terms table may offer (40 years).
pub const MAX_PAYBACK_PERIOD_MONTHS: u32 = 480;

/// Share of the price shown as "last payment" under the down-payment slider.
///
/// This figure is independent of the balloon fraction used by
/// [`compute_monthly_payment`]; the two are not reconciled.
pub const DEFAULT_LAST_PAYMENT_PERCENT: u32 = 49;

/// Errors raised while building a product terms table or selecting a product.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FinancingError {
    #[error("financing table has no products")]
    EmptyTable,

    #[error("product '{0}' is listed more than once")]
    DuplicateProduct(FinancingProduct),

    #[error("product '{0}' is not offered")]
    UnknownProduct(FinancingProduct),

    #[error("interest rate for '{product}' must be between 0 and 100, got {rate}")]
    InvalidInterestRate {
        product: FinancingProduct,
        rate: Decimal,
    },

    #[error("APR for '{product}' must be between 0 and 100, got {apr}")]
    InvalidApr {
        product: FinancingProduct,
        apr: Decimal,
    },

    #[error("balloon fraction for '{product}' must be in [0, 1), got {fraction}")]
    InvalidBalloonFraction {
        product: FinancingProduct,
        fraction: Decimal,
    },

    #[error("down payment range for '{product}' is invalid: {min}%..{max}%")]
    InvalidDownPaymentRange {
        product: FinancingProduct,
        min: u32,
        max: u32,
    },

    #[error("payback periods for '{product}' are invalid: {reason}")]
    InvalidPeriodDomain {
        product: FinancingProduct,
        reason: String,
    },
}

/// Named sets of product terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinancingPreset {
    /// Both products, as offered inside the checkout wizard.
    #[default]
    Checkout,
    /// Single regular-loan product of the standalone calculator page.
    Calculator,
}

/// Validated per-product terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancingTable {
    products: Vec<ProductTerms>,
}

impl FinancingTable {
    /// Builds a table from arbitrary terms, validating every entry.
    ///
    /// # Errors
    ///
    /// Returns [`FinancingError`] if the list is empty, a product appears
    /// twice, or any entry is out of range.
    pub fn new(products: Vec<ProductTerms>) -> Result<Self, FinancingError> {
        if products.is_empty() {
            return Err(FinancingError::EmptyTable);
        }

        let mut seen = HashSet::new();
        for terms in &products {
            if !seen.insert(terms.product) {
                return Err(FinancingError::DuplicateProduct(terms.product));
            }
            validate_terms(terms)?;
        }

        Ok(Self { products })
    }

    pub fn preset(preset: FinancingPreset) -> Self {
        match preset {
            FinancingPreset::Checkout => Self::checkout(),
            FinancingPreset::Calculator => Self::calculator(),
        }
    }

    /// Low instalment (9.50 % / 11.55 %) and regular loan (8.50 % / 10.25 %).
    pub fn checkout() -> Self {
        Self {
            products: vec![
                ProductTerms {
                    product: FinancingProduct::LowInstallment,
                    interest_rate: Decimal::new(950, 2),
                    apr: Decimal::new(1155, 2),
                    period_domain: PeriodDomain::Fixed {
                        months: vec![12, 24, 36, 48, 60, 72, 84, 96, 108, 120],
                    },
                    default_period: 36,
                    min_down_payment_percent: 10,
                    max_down_payment_percent: MAX_DOWN_PAYMENT_PERCENT,
                    balloon_fraction: Decimal::new(28, 2),
                },
                ProductTerms {
                    product: FinancingProduct::RegularLoan,
                    interest_rate: Decimal::new(850, 2),
                    apr: Decimal::new(1025, 2),
                    period_domain: PeriodDomain::MultiplesOfTwelve { min: 12, max: 96 },
                    default_period: 12,
                    min_down_payment_percent: 20,
                    max_down_payment_percent: MAX_DOWN_PAYMENT_PERCENT,
                    balloon_fraction: Decimal::ZERO,
                },
            ],
        }
    }

    /// Flat 8.45 % / 10.137 % regular loan.
    pub fn calculator() -> Self {
        Self {
            products: vec![ProductTerms {
                product: FinancingProduct::RegularLoan,
                interest_rate: Decimal::new(845, 2),
                apr: Decimal::new(10137, 3),
                period_domain: PeriodDomain::MultiplesOfTwelve { min: 12, max: 96 },
                default_period: 12,
                min_down_payment_percent: 20,
                max_down_payment_percent: MAX_DOWN_PAYMENT_PERCENT,
                balloon_fraction: Decimal::ZERO,
            }],
        }
    }

    pub fn terms(
        &self,
        product: FinancingProduct,
    ) -> Result<&ProductTerms, FinancingError> {
        self.products
            .iter()
            .find(|t| t.product == product)
            .ok_or(FinancingError::UnknownProduct(product))
    }

    pub fn products(&self) -> &[ProductTerms] {
        &self.products
    }

    /// The product a fresh calculator starts with (first table entry).
    pub fn default_terms(&self) -> &ProductTerms {
        &self.products[0]
    }
}

impl Default for FinancingTable {
    fn default() -> Self {
        Self::checkout()
    }
}

fn validate_terms(terms: &ProductTerms) -> Result<(), FinancingError> {
    let product = terms.product;
    let hundred = Decimal::ONE_HUNDRED;

    if terms.interest_rate <= Decimal::ZERO || terms.interest_rate >= hundred {
        return Err(FinancingError::InvalidInterestRate {
            product,
            rate: terms.interest_rate,
        });
    }
    if terms.apr <= Decimal::ZERO || terms.apr >= hundred {
        return Err(FinancingError::InvalidApr {
            product,
            apr: terms.apr,
        });
    }
    if terms.balloon_fraction < Decimal::ZERO || terms.balloon_fraction >= Decimal::ONE {
        return Err(FinancingError::InvalidBalloonFraction {
            product,
            fraction: terms.balloon_fraction,
        });
    }

    let (min, max) = (
        terms.min_down_payment_percent,
        terms.max_down_payment_percent,
    );
    if min > max
        || max > MAX_DOWN_PAYMENT_PERCENT
        || min % DOWN_PAYMENT_STEP != 0
        || max % DOWN_PAYMENT_STEP != 0
    {
        return Err(FinancingError::InvalidDownPaymentRange { product, min, max });
    }

    let invalid_period = |reason: &str| FinancingError::InvalidPeriodDomain {
        product,
        reason: reason.to_string(),
    };
    match &terms.period_domain {
        PeriodDomain::Fixed { months } => {
            if months.is_empty() {
                return Err(invalid_period("no periods listed"));
            }
            if months.iter().any(|m| *m < 12 || m % 12 != 0) {
                return Err(invalid_period("periods must be multiples of 12 months"));
            }
            if months.iter().any(|m| *m > MAX_PAYBACK_PERIOD_MONTHS) {
                return Err(invalid_period("periods must not exceed 480 months"));
            }
        }
        PeriodDomain::MultiplesOfTwelve { min, max } => {
            if *min < 12 || min % 12 != 0 || max % 12 != 0 || min > max {
                return Err(invalid_period("bounds must be multiples of 12 with min <= max"));
            }
            if *max > MAX_PAYBACK_PERIOD_MONTHS {
                return Err(invalid_period("periods must not exceed 480 months"));
            }
        }
    }
    if !terms.period_domain.contains(terms.default_period) {
        return Err(invalid_period("default period is not a legal value"));
    }

    Ok(())
}

/// Snaps `months` to the nearest legal period of `domain`.
///
/// For multiple-of-12 ranges the value is clamped first and then rounded to
/// the nearest multiple of 12, a remainder of 6 or more rounding up. For
/// fixed lists the nearest member wins, ties going to the longer period.
pub fn snap_period(
    domain: &PeriodDomain,
    months: u32,
) -> u32 {
    match domain {
        PeriodDomain::MultiplesOfTwelve { min, max } => {
            let clamped = months.clamp(*min, *max);
            let remainder = clamped % 12;
            if remainder >= 6 {
                clamped - remainder + 12
            } else {
                clamped - remainder
            }
        }
        PeriodDomain::Fixed { .. } => domain
            .values()
            .into_iter()
            .min_by_key(|legal| (legal.abs_diff(months), u32::MAX - legal))
            .unwrap_or(months),
    }
}

/// Snaps a down payment to the nearest 10 % step within `[min, max]`.
pub fn snap_down_payment(
    min: u32,
    max: u32,
    percent: u32,
) -> u32 {
    let clamped = percent.clamp(min, max);
    let stepped = (clamped + DOWN_PAYMENT_STEP / 2) / DOWN_PAYMENT_STEP * DOWN_PAYMENT_STEP;
    stepped.clamp(min, max)
}

/// Monthly installment for the given inputs, rounded to whole currency units.
///
/// Returns zero when nothing is borrowed.
pub fn compute_monthly_payment(
    total_price: Decimal,
    terms: &ProductTerms,
    payback_period_months: u32,
    down_payment_percent: u32,
) -> Decimal {
    let loan_amount = total_price - percent_of(total_price, Decimal::from(down_payment_percent));
    if loan_amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let financed_amount = loan_amount - loan_amount * terms.balloon_fraction;
    if payback_period_months == 0 {
        return round_to_unit(financed_amount);
    }

    let months = Decimal::from(payback_period_months);
    let monthly_rate = terms.interest_rate / Decimal::ONE_HUNDRED / Decimal::from(12);
    if monthly_rate.is_zero() {
        return round_to_unit(financed_amount / months);
    }

    let factor = (Decimal::ONE + monthly_rate).powu(u64::from(payback_period_months));
    round_to_unit(financed_amount * monthly_rate * factor / (factor - Decimal::ONE))
}

/// Indicative "last payment" shown next to the down-payment slider.
pub fn indicative_last_payment(
    total_price: Decimal,
    last_payment_percent: u32,
) -> Decimal {
    round_to_unit(percent_of(total_price, Decimal::from(last_payment_percent)))
}

/// User-controlled inputs of the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingSelection {
    pub product: FinancingProduct,
    pub payback_period_months: u32,
    pub down_payment_percent: u32,
    pub total_price: Decimal,
}

/// Figures derived from a [`FinancingSelection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingQuote {
    pub product: FinancingProduct,
    pub total_price: Decimal,
    pub payback_period_months: u32,
    pub down_payment_percent: u32,
    pub down_payment_amount: Decimal,
    pub loan_amount: Decimal,

    /// Part of the loan deferred to the final payment (zero for regular loans).
    pub balloon_amount: Decimal,

    /// Part of the loan amortized by the monthly installments.
    pub financed_amount: Decimal,
    pub monthly_payment: Decimal,
    pub total_amount_paid: Decimal,

    /// Indicative last payment shown under the down-payment slider. Not
    /// related to `balloon_amount`.
    pub indicative_last_payment: Decimal,
    pub interest_rate: Decimal,
    pub apr: Decimal,
}

impl fmt::Display for FinancingQuote {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Product:            {}", self.product.label())?;
        writeln!(f, "Total price:        {}", self.total_price)?;
        writeln!(
            f,
            "Down payment:       {}% = {}",
            self.down_payment_percent, self.down_payment_amount
        )?;
        writeln!(f, "Loan amount:        {}", self.loan_amount)?;
        writeln!(f, "Balloon payment:    {}", self.balloon_amount)?;
        writeln!(f, "Payback period:     {} months", self.payback_period_months)?;
        writeln!(f, "Monthly payment:    {}", self.monthly_payment)?;
        writeln!(f, "Total amount paid:  {}", self.total_amount_paid)?;
        writeln!(f, "Last payment:       {}", self.indicative_last_payment)?;
        write!(f, "Interest rate/APR:  {}% / {}%", self.interest_rate, self.apr)
    }
}

/// Stateful calculator holding one [`FinancingSelection`].
///
/// Every mutator re-establishes the domain invariant before returning.
#[derive(Debug, Clone)]
pub struct FinancingCalculator {
    table: FinancingTable,
    terms: ProductTerms,
    selection: FinancingSelection,
}

impl FinancingCalculator {
    /// Starts on the table's first product with its default period and
    /// minimum down payment.
    pub fn new(
        table: FinancingTable,
        total_price: Decimal,
    ) -> Self {
        let terms = table.default_terms().clone();
        let selection = FinancingSelection {
            product: terms.product,
            payback_period_months: terms.default_period,
            down_payment_percent: terms.min_down_payment_percent,
            total_price: total_price.max(Decimal::ZERO),
        };
        Self {
            table,
            terms,
            selection,
        }
    }

    pub fn selection(&self) -> &FinancingSelection {
        &self.selection
    }

    pub fn terms(&self) -> &ProductTerms {
        &self.terms
    }

    pub fn table(&self) -> &FinancingTable {
        &self.table
    }

    /// Switches product and snaps period and down payment into its domain.
    ///
    /// # Errors
    ///
    /// [`FinancingError::UnknownProduct`] if the table does not offer `product`.
    pub fn select_product(
        &mut self,
        product: FinancingProduct,
    ) -> Result<(), FinancingError> {
        self.terms = self.table.terms(product)?.clone();
        self.selection.product = product;
        self.enforce_domain();
        Ok(())
    }

    pub fn set_payback_period(
        &mut self,
        months: u32,
    ) {
        self.selection.payback_period_months = months;
        self.enforce_domain();
    }

    pub fn set_down_payment_percent(
        &mut self,
        percent: u32,
    ) {
        self.selection.down_payment_percent = percent;
        self.enforce_domain();
    }

    /// Negative prices are treated as zero.
    pub fn set_total_price(
        &mut self,
        total_price: Decimal,
    ) {
        if total_price < Decimal::ZERO {
            debug!(%total_price, "negative total price clamped to zero");
        }
        self.selection.total_price = total_price.max(Decimal::ZERO);
    }

    pub fn compute_monthly_payment(&self) -> Decimal {
        compute_monthly_payment(
            self.selection.total_price,
            &self.terms,
            self.selection.payback_period_months,
            self.selection.down_payment_percent,
        )
    }

    pub fn indicative_last_payment(&self) -> Decimal {
        indicative_last_payment(self.selection.total_price, DEFAULT_LAST_PAYMENT_PERCENT)
    }

    pub fn quote(&self) -> FinancingQuote {
        let s = &self.selection;
        let down_payment_amount =
            round_half_up(percent_of(s.total_price, Decimal::from(s.down_payment_percent)));
        let loan_amount = s.total_price - down_payment_amount;
        let balloon_amount = round_half_up(loan_amount * self.terms.balloon_fraction);
        let monthly_payment = self.compute_monthly_payment();

        FinancingQuote {
            product: s.product,
            total_price: s.total_price,
            payback_period_months: s.payback_period_months,
            down_payment_percent: s.down_payment_percent,
            down_payment_amount,
            loan_amount,
            balloon_amount,
            financed_amount: loan_amount - balloon_amount,
            monthly_payment,
            total_amount_paid: down_payment_amount
                + monthly_payment * Decimal::from(s.payback_period_months)
                + balloon_amount,
            indicative_last_payment: self.indicative_last_payment(),
            interest_rate: self.terms.interest_rate,
            apr: self.terms.apr,
        }
    }

    fn enforce_domain(&mut self) {
        let period = snap_period(
            &self.terms.period_domain,
            self.selection.payback_period_months,
        );
        if period != self.selection.payback_period_months {
            debug!(
                product = %self.terms.product,
                from = self.selection.payback_period_months,
                to = period,
                "payback period corrected"
            );
            self.selection.payback_period_months = period;
        }

        let percent = snap_down_payment(
            self.terms.min_down_payment_percent,
            self.terms.max_down_payment_percent,
            self.selection.down_payment_percent,
        );
        if percent != self.selection.down_payment_percent {
            debug!(
                product = %self.terms.product,
                from = self.selection.down_payment_percent,
                to = percent,
                "down payment corrected"
            );
            self.selection.down_payment_percent = percent;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn regular_845() -> ProductTerms {
        FinancingTable::calculator().default_terms().clone()
    }

    fn checkout_terms(product: FinancingProduct) -> ProductTerms {
        FinancingTable::checkout().terms(product).unwrap().clone()
    }

    // =========================================================================
    // compute_monthly_payment
    // =========================================================================

    #[test]
    fn regular_loan_reference_quote() {
        let payment = compute_monthly_payment(dec!(25000), &regular_845(), 48, 30);

        // 17500 at 0.0070417/month over 48 months = 430.93
        assert_eq!(payment, dec!(431));
    }

    #[test]
    fn regular_loan_checkout_rate() {
        let terms = checkout_terms(FinancingProduct::RegularLoan);

        assert_eq!(compute_monthly_payment(dec!(27440), &terms, 12, 20), dec!(1915));
        assert_eq!(compute_monthly_payment(dec!(30000), &terms, 60, 20), dec!(492));
    }

    #[test]
    fn low_installment_finances_only_non_balloon_part() {
        let terms = checkout_terms(FinancingProduct::LowInstallment);

        assert_eq!(compute_monthly_payment(dec!(27440), &terms, 36, 40), dec!(380));
        assert_eq!(compute_monthly_payment(dec!(27440), &terms, 48, 10), dec!(447));
        assert_eq!(compute_monthly_payment(dec!(20000), &terms, 24, 50), dec!(331));
    }

    #[test]
    fn zero_loan_pays_nothing() {
        let low = checkout_terms(FinancingProduct::LowInstallment);

        assert_eq!(compute_monthly_payment(dec!(0), &regular_845(), 96, 20), Decimal::ZERO);
        assert_eq!(compute_monthly_payment(dec!(0), &low, 12, 10), Decimal::ZERO);
        assert_eq!(compute_monthly_payment(dec!(25000), &low, 12, 100), Decimal::ZERO);
    }

    #[test]
    fn payment_is_deterministic() {
        let terms = checkout_terms(FinancingProduct::LowInstallment);
        let first = compute_monthly_payment(dec!(31999.99), &terms, 84, 30);

        for _ in 0..10 {
            assert_eq!(compute_monthly_payment(dec!(31999.99), &terms, 84, 30), first);
        }
    }

    #[test]
    fn zero_rate_degrades_to_straight_line() {
        let mut terms = regular_845();
        terms.interest_rate = Decimal::ZERO;

        assert_eq!(compute_monthly_payment(dec!(12000), &terms, 12, 0), dec!(1000));
    }

    #[test]
    fn indicative_last_payment_uses_price_share() {
        assert_eq!(indicative_last_payment(dec!(27440), 49), dec!(13446));
    }

    // =========================================================================
    // snapping
    // =========================================================================

    #[test]
    fn snap_period_rounds_remainder_six_up() {
        let domain = PeriodDomain::MultiplesOfTwelve { min: 12, max: 96 };

        assert_eq!(snap_period(&domain, 30), 36);
        assert_eq!(snap_period(&domain, 29), 24);
        assert_eq!(snap_period(&domain, 41), 36);
        assert_eq!(snap_period(&domain, 48), 48);
    }

    #[test]
    fn snap_period_clamps_to_range() {
        let domain = PeriodDomain::MultiplesOfTwelve { min: 12, max: 96 };

        assert_eq!(snap_period(&domain, 0), 12);
        assert_eq!(snap_period(&domain, 120), 96);
        assert_eq!(snap_period(&domain, 240), 96);
    }

    #[test]
    fn snap_period_fixed_picks_nearest_member() {
        let domain = PeriodDomain::Fixed {
            months: vec![24, 36, 48],
        };

        assert_eq!(snap_period(&domain, 12), 24);
        assert_eq!(snap_period(&domain, 96), 48);
        assert_eq!(snap_period(&domain, 30), 36); // tie goes to the longer period
        assert_eq!(snap_period(&domain, 36), 36);
    }

    #[test]
    fn snap_down_payment_steps_and_clamps() {
        assert_eq!(snap_down_payment(20, 90, 12), 20);
        assert_eq!(snap_down_payment(10, 90, 12), 10);
        assert_eq!(snap_down_payment(10, 90, 15), 20);
        assert_eq!(snap_down_payment(10, 90, 44), 40);
        assert_eq!(snap_down_payment(10, 90, 95), 90);
    }

    // =========================================================================
    // FinancingCalculator
    // =========================================================================

    #[test]
    fn new_calculator_starts_on_first_product_defaults() {
        let calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(27440));
        let s = calculator.selection();

        assert_eq!(s.product, FinancingProduct::LowInstallment);
        assert_eq!(s.payback_period_months, 36);
        assert_eq!(s.down_payment_percent, 10);
    }

    #[test]
    fn select_product_raises_down_payment_to_new_minimum() {
        let mut calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(27440));
        calculator.set_down_payment_percent(10);

        calculator
            .select_product(FinancingProduct::RegularLoan)
            .unwrap();

        assert_eq!(calculator.selection().down_payment_percent, 20);
    }

    #[test]
    fn select_product_clamps_period_into_new_domain() {
        let mut calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(27440));
        calculator.set_payback_period(120);

        calculator
            .select_product(FinancingProduct::RegularLoan)
            .unwrap();

        assert_eq!(calculator.selection().payback_period_months, 96);
    }

    #[test]
    fn select_product_keeps_legal_values() {
        let mut calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(27440));
        calculator
            .select_product(FinancingProduct::RegularLoan)
            .unwrap();
        calculator.set_payback_period(48);
        calculator.set_down_payment_percent(50);

        calculator
            .select_product(FinancingProduct::LowInstallment)
            .unwrap();

        assert_eq!(calculator.selection().payback_period_months, 48);
        assert_eq!(calculator.selection().down_payment_percent, 50);
    }

    #[test]
    fn every_product_transition_lands_in_domain() {
        let table = FinancingTable::checkout();
        let products = [
            FinancingProduct::LowInstallment,
            FinancingProduct::RegularLoan,
        ];

        for from in products {
            for to in products {
                for months in [0, 7, 12, 30, 66, 100, 120, 240] {
                    for percent in [0, 5, 12, 25, 55, 90, 100] {
                        let mut calculator = FinancingCalculator::new(table.clone(), dec!(20000));
                        calculator.select_product(from).unwrap();
                        calculator.set_payback_period(months);
                        calculator.set_down_payment_percent(percent);
                        calculator.select_product(to).unwrap();

                        let terms = table.terms(to).unwrap();
                        let s = calculator.selection();
                        assert!(terms.period_domain.contains(s.payback_period_months));
                        assert!(s.down_payment_percent >= terms.min_down_payment_percent);
                        assert!(s.down_payment_percent <= MAX_DOWN_PAYMENT_PERCENT);
                        assert_eq!(s.down_payment_percent % DOWN_PAYMENT_STEP, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn select_unknown_product_fails_and_keeps_state() {
        let mut calculator = FinancingCalculator::new(FinancingTable::calculator(), dec!(25000));
        let before = calculator.selection().clone();

        let result = calculator.select_product(FinancingProduct::LowInstallment);

        assert_eq!(
            result,
            Err(FinancingError::UnknownProduct(
                FinancingProduct::LowInstallment
            ))
        );
        assert_eq!(calculator.selection(), &before);
    }

    #[test]
    fn quote_reference_values() {
        let mut calculator = FinancingCalculator::new(FinancingTable::calculator(), dec!(25000));
        calculator.set_down_payment_percent(30);
        calculator.set_payback_period(48);

        let quote = calculator.quote();

        assert_eq!(quote.down_payment_amount, dec!(7500));
        assert_eq!(quote.loan_amount, dec!(17500));
        assert_eq!(quote.balloon_amount, dec!(0));
        assert_eq!(quote.monthly_payment, dec!(431));
        assert_eq!(quote.total_amount_paid, dec!(28188));
        assert_eq!(quote.indicative_last_payment, dec!(12250));
        assert_eq!(quote.interest_rate, dec!(8.45));
        assert_eq!(quote.apr, dec!(10.137));
    }

    #[test]
    fn quote_display_shows_last_payment() {
        let calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(27440));

        let printed = calculator.quote().to_string();

        assert!(printed.contains("Last payment:       13446"), "{printed}");
        assert!(printed.contains("Balloon payment:"), "{printed}");
    }

    #[test]
    fn quote_low_installment_reports_balloon() {
        let mut calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(27440));
        calculator.set_down_payment_percent(40);
        calculator.set_payback_period(36);

        let quote = calculator.quote();

        assert_eq!(quote.loan_amount, dec!(16464));
        assert_eq!(quote.balloon_amount, dec!(4609.92));
        assert_eq!(quote.financed_amount, dec!(11854.08));
        assert_eq!(quote.monthly_payment, dec!(380));
    }

    #[test]
    fn negative_price_is_clamped() {
        let mut calculator = FinancingCalculator::new(FinancingTable::checkout(), dec!(1000));
        calculator.set_total_price(dec!(-5));

        assert_eq!(calculator.selection().total_price, Decimal::ZERO);
        assert_eq!(calculator.compute_monthly_payment(), Decimal::ZERO);
    }

    // =========================================================================
    // FinancingTable validation
    // =========================================================================

    #[test]
    fn presets_are_valid() {
        assert!(FinancingTable::new(FinancingTable::checkout().products().to_vec()).is_ok());
        assert!(FinancingTable::new(FinancingTable::calculator().products().to_vec()).is_ok());
    }

    #[test]
    fn empty_table_rejected() {
        assert_eq!(FinancingTable::new(vec![]), Err(FinancingError::EmptyTable));
    }

    #[test]
    fn duplicate_product_rejected() {
        let terms = regular_845();

        assert_eq!(
            FinancingTable::new(vec![terms.clone(), terms]),
            Err(FinancingError::DuplicateProduct(
                FinancingProduct::RegularLoan
            ))
        );
    }

    #[test]
    fn zero_rate_rejected() {
        let mut terms = regular_845();
        terms.interest_rate = Decimal::ZERO;

        assert!(matches!(
            FinancingTable::new(vec![terms]),
            Err(FinancingError::InvalidInterestRate { .. })
        ));
    }

    #[test]
    fn full_balloon_rejected() {
        let mut terms = regular_845();
        terms.balloon_fraction = Decimal::ONE;

        assert!(matches!(
            FinancingTable::new(vec![terms]),
            Err(FinancingError::InvalidBalloonFraction { .. })
        ));
    }

    #[test]
    fn off_step_down_payment_range_rejected() {
        let mut terms = regular_845();
        terms.min_down_payment_percent = 15;

        assert!(matches!(
            FinancingTable::new(vec![terms]),
            Err(FinancingError::InvalidDownPaymentRange { .. })
        ));
    }

    #[test]
    fn overlong_fixed_period_rejected() {
        let mut terms = regular_845();
        terms.period_domain = PeriodDomain::Fixed {
            months: vec![36, 12000],
        };
        terms.default_period = 36;

        assert!(matches!(
            FinancingTable::new(vec![terms]),
            Err(FinancingError::InvalidPeriodDomain { .. })
        ));
    }

    #[test]
    fn overlong_period_range_rejected() {
        let mut terms = regular_845();
        terms.period_domain = PeriodDomain::MultiplesOfTwelve {
            min: 12,
            max: 492,
        };

        assert!(matches!(
            FinancingTable::new(vec![terms.clone()]),
            Err(FinancingError::InvalidPeriodDomain { .. })
        ));

        terms.period_domain = PeriodDomain::MultiplesOfTwelve {
            min: 12,
            max: MAX_PAYBACK_PERIOD_MONTHS,
        };
        let table = FinancingTable::new(vec![terms]).unwrap();
        let mut calculator = FinancingCalculator::new(table, dec!(25000));
        calculator.set_payback_period(12000);

        assert_eq!(calculator.selection().payback_period_months, 480);
        assert!(calculator.compute_monthly_payment() > Decimal::ZERO);
    }

    #[test]
    fn period_domain_not_multiple_of_twelve_rejected() {
        let mut terms = regular_845();
        terms.period_domain = PeriodDomain::Fixed {
            months: vec![18, 24],
        };
        terms.default_period = 24;

        assert!(matches!(
            FinancingTable::new(vec![terms]),
            Err(FinancingError::InvalidPeriodDomain { .. })
        ));
    }

    #[test]
    fn illegal_default_period_rejected() {
        let mut terms = regular_845();
        terms.default_period = 120;

        assert!(matches!(
            FinancingTable::new(vec![terms]),
            Err(FinancingError::InvalidPeriodDomain { .. })
        ));
    }
}
