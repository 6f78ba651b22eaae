use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use checkout_core::{
    BackendRegistry, CheckoutSession, FinancingCalculator, FinancingError, FinancingProduct,
    FinancingQuote, FinancingTable, MarketplaceBackend, SessionError, StepKey, StepStatus,
    WizardError, WizardEvent,
};
use checkout_db_sqlite::SqliteBackendFactory;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::script::{CalculatorAction, ScriptStep, WalkthroughScript};

/// Build a registry with every backend compiled into this binary.
pub fn build_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(SqliteBackendFactory));
    registry
}

pub async fn open_backend(config: &AppConfig) -> Result<Box<dyn MarketplaceBackend>> {
    debug!(backend = %config.backend.backend, "connecting");
    build_registry()
        .create(&config.backend)
        .await
        .with_context(|| format!("cannot open '{}' backend", config.backend.backend))
}

pub async fn open_session(config: &AppConfig) -> Result<CheckoutSession> {
    let backend = open_backend(config).await?;
    let table = config.financing_table()?;
    Ok(CheckoutSession::new(backend, table, config.approval_delay()))
}

/// Inputs of the `quote` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub price: Decimal,
    pub product: FinancingProduct,
    pub months: u32,
    pub down_payment_percent: u32,
}

/// Out-of-range months or down payment are snapped, as in the calculator UI.
pub fn quote(
    table: FinancingTable,
    request: &QuoteRequest,
) -> Result<FinancingQuote, FinancingError> {
    let mut calculator = FinancingCalculator::new(table, request.price);
    calculator.select_product(request.product)?;
    calculator.set_payback_period(request.months);
    calculator.set_down_payment_percent(request.down_payment_percent);

    let selection = calculator.selection();
    if selection.payback_period_months != request.months
        || selection.down_payment_percent != request.down_payment_percent
    {
        info!(
            months = selection.payback_period_months,
            down_payment = selection.down_payment_percent,
            "inputs snapped to the product's legal values"
        );
    }
    Ok(calculator.quote())
}

// ─── walkthrough ─────────────────────────────────────────────────────────────

/// What happened during one script step, plus the step statuses after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub label: String,
    pub notes: Vec<String>,
    pub statuses: Vec<(StepKey, StepStatus)>,
    pub monthly_payment: Decimal,
}

impl StepReport {
    pub fn status(
        &self,
        step: StepKey,
    ) -> Option<StepStatus> {
        self.statuses
            .iter()
            .find(|(key, _)| *key == step)
            .map(|(_, status)| *status)
    }
}

impl fmt::Display for StepReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:", self.label)?;
        for (step, status) in &self.statuses {
            write!(f, " {step}={}", status.as_str())?;
        }
        write!(f, " | monthly {}", self.monthly_payment)?;
        for note in &self.notes {
            write!(f, "\n    {note}")?;
        }
        Ok(())
    }
}

/// Loads the car and its charges, then replays `script` step by step.
///
/// Rejected events and backend failures are recorded in the step's notes
/// and the walkthrough carries on.
pub async fn run_walkthrough(
    session: &mut CheckoutSession,
    script: &WalkthroughScript,
    car_override: Option<&str>,
) -> Result<Vec<StepReport>> {
    let car_id = car_override
        .or(script.car.as_deref())
        .context("no car given; set `car` in the script or pass --car")?;

    session
        .load_car(car_id)
        .await
        .with_context(|| format!("cannot load car '{car_id}'"))?;
    session
        .load_charges(script.zipcode.as_deref())
        .await
        .context("cannot load charges")?;

    let mut reports = Vec::with_capacity(script.steps.len());
    for step in &script.steps {
        let notes = run_step(session, step).await;
        reports.push(StepReport {
            label: step.label(),
            notes,
            statuses: session.wizard().steps().iter().collect(),
            monthly_payment: session.calculator().compute_monthly_payment(),
        });
    }
    Ok(reports)
}

async fn run_step(
    session: &mut CheckoutSession,
    step: &ScriptStep,
) -> Vec<String> {
    let mut notes = Vec::new();

    if let Some(action) = &step.calculator {
        if let Err(e) = apply_calculator(session, action) {
            notes.push(format!("calculator: {e}"));
        }
    }

    if let Some(event) = step.event.clone() {
        let result = match event {
            WizardEvent::SubmitFinancingApplication { form, consent } => {
                session.submit_financing_application(form, consent).await
            }
            other => session.dispatch(other),
        };
        if let Err(e) = result {
            notes.push(describe_error(&e));
        }
    }

    if step.pay_inspection {
        match session.start_inspection_payment().await {
            Ok(navigate) => notes.push(format!("navigate to {}", navigate.url)),
            Err(e) => notes.push(describe_error(&e)),
        }
    }

    if let Some(secs) = step.wait_secs {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        tokio::task::yield_now().await;
        match session.pump() {
            Ok(0) => {}
            Ok(n) => notes.push(format!("applied {n} queued event(s)")),
            Err(e) => notes.push(describe_error(&e)),
        }
    }

    notes
}

fn apply_calculator(
    session: &mut CheckoutSession,
    action: &CalculatorAction,
) -> Result<(), FinancingError> {
    let calculator = session.calculator_mut();
    if let Some(product) = action.product {
        calculator.select_product(product)?;
    }
    if let Some(months) = action.months {
        calculator.set_payback_period(months);
    }
    if let Some(percent) = action.down_payment {
        calculator.set_down_payment_percent(percent);
    }
    Ok(())
}

fn describe_error(error: &SessionError) -> String {
    match error {
        SessionError::Wizard(WizardError::InvalidForm(fields)) => {
            let fields: Vec<_> = fields.iter().map(ToString::to_string).collect();
            format!("rejected: invalid form ({})", fields.join("; "))
        }
        SessionError::Wizard(e) => format!("rejected: {e}"),
        other => {
            warn!(error = %other, "walkthrough step failed");
            format!("failed: {other}")
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn request(
        product: FinancingProduct,
        months: u32,
        down_payment_percent: u32,
    ) -> QuoteRequest {
        QuoteRequest {
            price: dec!(25000),
            product,
            months,
            down_payment_percent,
        }
    }

    #[test]
    fn quote_regular_loan_on_calculator_preset() {
        let quote = quote(
            FinancingTable::calculator(),
            &request(FinancingProduct::RegularLoan, 48, 30),
        )
        .unwrap();

        assert_eq!(quote.down_payment_amount, dec!(7500));
        assert_eq!(quote.loan_amount, dec!(17500));
        assert_eq!(quote.monthly_payment, dec!(431));
    }

    #[test]
    fn quote_snaps_out_of_range_inputs() {
        let quote = quote(
            FinancingTable::calculator(),
            &request(FinancingProduct::RegularLoan, 47, 33),
        )
        .unwrap();

        assert_eq!(quote.payback_period_months, 48);
        assert_eq!(quote.down_payment_percent, 30);
    }

    #[test]
    fn quote_unknown_product_for_preset() {
        let result = quote(
            FinancingTable::calculator(),
            &request(FinancingProduct::LowInstallment, 36, 30),
        );

        assert_eq!(
            result,
            Err(FinancingError::UnknownProduct(FinancingProduct::LowInstallment))
        );
    }

    #[test]
    fn report_lists_statuses_and_notes() {
        let report = StepReport {
            label: "restart".to_string(),
            notes: vec!["rejected: checkout is already complete".to_string()],
            statuses: vec![
                (StepKey::Payment, StepStatus::Completed),
                (StepKey::Inspection, StepStatus::Active),
            ],
            monthly_payment: dec!(431),
        };

        assert_eq!(
            report.to_string(),
            "restart: payment=completed inspection=active | monthly 431\n    rejected: checkout is already complete"
        );
        assert_eq!(report.status(StepKey::Inspection), Some(StepStatus::Active));
        assert_eq!(report.status(StepKey::Delivery), None);
    }
}
