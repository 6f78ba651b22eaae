//! One customer's checkout: wizard, calculator, backend and timers.
//!
//! The session is the only place where wizard effects are carried out. The
//! auto-approval timer is a tokio task that posts
//! [`WizardEvent::FinancingApproved`] into the session's event channel;
//! [`CheckoutSession::pump`] feeds queued events back into the reducer.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendError, MarketplaceBackend};
use crate::calculations::{FinancingCalculator, FinancingTable};
use crate::forms::FinancingApplicationForm;
use crate::wizard::{CheckoutWizard, WizardEffect, WizardError, WizardEvent};
use crate::{CarRecord, Charges};

/// Session-storage key holding the id of the last inspection payment session.
pub const INSPECTION_SESSION_KEY: &str = "inspection_session_id";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("no car is loaded")]
    NoCarLoaded,

    #[error("checkout url '{0}' does not contain a session id")]
    MissingSessionId(String),

    #[error("financing applications go through submit_financing_application")]
    DirectSubmission,
}

/// Instruction to leave the app for an external page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigate {
    pub url: String,
}

pub struct CheckoutSession {
    backend: Box<dyn MarketplaceBackend>,
    wizard: CheckoutWizard,
    calculator: FinancingCalculator,
    car: Option<CarRecord>,
    similar_cars: Vec<CarRecord>,
    charges: Option<Charges>,
    storage: HashMap<String, String>,
    financing_draft: Option<FinancingApplicationForm>,
    events_tx: mpsc::UnboundedSender<WizardEvent>,
    events_rx: mpsc::UnboundedReceiver<WizardEvent>,
    approval_timer: Option<JoinHandle<()>>,
}

impl CheckoutSession {
    pub fn new(
        backend: Box<dyn MarketplaceBackend>,
        table: FinancingTable,
        approval_delay: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            wizard: CheckoutWizard::new(approval_delay),
            calculator: FinancingCalculator::new(table, rust_decimal::Decimal::ZERO),
            car: None,
            similar_cars: Vec::new(),
            charges: None,
            storage: HashMap::new(),
            financing_draft: None,
            events_tx,
            events_rx,
            approval_timer: None,
        }
    }

    pub fn wizard(&self) -> &CheckoutWizard {
        &self.wizard
    }

    pub fn calculator(&self) -> &FinancingCalculator {
        &self.calculator
    }

    /// Calculator changes never touch the wizard.
    pub fn calculator_mut(&mut self) -> &mut FinancingCalculator {
        &mut self.calculator
    }

    pub fn car(&self) -> Option<&CarRecord> {
        self.car.as_ref()
    }

    pub fn similar_cars(&self) -> &[CarRecord] {
        &self.similar_cars
    }

    pub fn charges(&self) -> Option<&Charges> {
        self.charges.as_ref()
    }

    pub fn session_value(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.storage.get(key).map(String::as_str)
    }

    /// The financing form as last entered, until the wizard resets it.
    pub fn financing_draft(&self) -> Option<&FinancingApplicationForm> {
        self.financing_draft.as_ref()
    }

    pub fn save_financing_draft(
        &mut self,
        form: FinancingApplicationForm,
    ) {
        self.financing_draft = Some(form);
    }

    /// True while an approval timer is scheduled and has not fired.
    pub fn approval_pending(&self) -> bool {
        self.approval_timer
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ─── Backend calls ──────────────────────────────────────────────────────

    /// Fetches the car and its similar cars; the car price becomes the
    /// calculator's total price.
    pub async fn load_car(
        &mut self,
        id: &str,
    ) -> Result<&CarRecord, SessionError> {
        let car = self.backend.get_car(id).await.inspect_err(|e| {
            error!(car_id = id, error = %e, "failed to load car");
        })?;
        let similar = self.backend.get_similar_cars(id).await.inspect_err(|e| {
            error!(car_id = id, error = %e, "failed to load similar cars");
        })?;

        info!(car = %car.title(), similar = similar.len(), "car loaded");
        self.calculator.set_total_price(car.price);
        self.similar_cars = similar;
        Ok(self.car.insert(car))
    }

    pub async fn load_charges(
        &mut self,
        zipcode: Option<&str>,
    ) -> Result<&Charges, SessionError> {
        let car_id = self.car_id()?;
        let charges = self
            .backend
            .get_charges(&car_id, zipcode)
            .await
            .inspect_err(|e| error!(car_id = %car_id, error = %e, "failed to load charges"))?;

        debug!(car_id = %car_id, total = %charges.total_price, "charges loaded");
        Ok(self.charges.insert(charges))
    }

    /// Creates a hosted payment session for the inspection fee.
    ///
    /// The session id (last path segment of the checkout URL) is kept in
    /// session storage under [`INSPECTION_SESSION_KEY`].
    pub async fn start_inspection_payment(&mut self) -> Result<Navigate, SessionError> {
        let car_id = self.car_id()?;
        let session = self
            .backend
            .create_inspection_session(&car_id)
            .await
            .inspect_err(|e| error!(car_id = %car_id, error = %e, "failed to create inspection session"))?;

        let session_id = session_id_from_url(&session.checkout_url)
            .ok_or_else(|| SessionError::MissingSessionId(session.checkout_url.clone()))?;
        self.storage
            .insert(INSPECTION_SESSION_KEY.to_string(), session_id.to_string());

        info!(car_id = %car_id, session_id, "inspection payment started");
        Ok(Navigate {
            url: session.checkout_url,
        })
    }

    /// Validates, submits to the backend, then dispatches the submission.
    ///
    /// The form is kept as the draft either way. A backend failure leaves the
    /// wizard untouched.
    pub async fn submit_financing_application(
        &mut self,
        form: FinancingApplicationForm,
        consent: bool,
    ) -> Result<Vec<WizardEffect>, SessionError> {
        let car_id = self.car_id()?;
        self.financing_draft = Some(form.clone());
        let application = self.wizard.check_financing_submission(&form, consent)?;

        self.backend
            .apply_finance(&car_id, &application)
            .await
            .inspect_err(|e| error!(car_id = %car_id, error = %e, "financing application failed"))?;

        self.apply(WizardEvent::SubmitFinancingApplication { form, consent })
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    /// Forwards an event to the wizard and runs the resulting effects.
    ///
    /// Submissions are refused with [`SessionError::DirectSubmission`]; they
    /// must reach the backend first via
    /// [`submit_financing_application`](Self::submit_financing_application).
    pub fn dispatch(
        &mut self,
        event: WizardEvent,
    ) -> Result<Vec<WizardEffect>, SessionError> {
        if matches!(event, WizardEvent::SubmitFinancingApplication { .. }) {
            warn!("financing application dispatched without backend submission");
            return Err(SessionError::DirectSubmission);
        }
        self.apply(event)
    }

    /// Scheduling the approval timer needs a tokio runtime; without one the
    /// timer is skipped and a warning is logged.
    fn apply(
        &mut self,
        event: WizardEvent,
    ) -> Result<Vec<WizardEffect>, SessionError> {
        let effects = self.wizard.dispatch(event)?;
        for effect in &effects {
            self.run_effect(*effect);
        }
        Ok(effects)
    }

    /// Applies every queued event (e.g. a fired approval). Returns how many
    /// were applied.
    pub fn pump(&mut self) -> Result<usize, SessionError> {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn run_effect(
        &mut self,
        effect: WizardEffect,
    ) {
        match effect {
            WizardEffect::ScheduleApproval(delay) => self.schedule_approval(delay),
            WizardEffect::CancelApproval => self.cancel_approval(),
            WizardEffect::ScrollIntoView(step) => debug!(%step, "scroll into view"),
            WizardEffect::ShowBillingForm => debug!("billing form shown"),
            WizardEffect::ResetFinancingForm => {
                if self.financing_draft.take().is_some() {
                    debug!("financing draft cleared");
                }
            }
        }
    }

    fn schedule_approval(
        &mut self,
        delay: Duration,
    ) {
        self.cancel_approval();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; financing approval not scheduled");
            return;
        };

        let tx = self.events_tx.clone();
        self.approval_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(WizardEvent::FinancingApproved).is_err() {
                debug!("session gone before financing approval");
            }
        }));
        debug!(?delay, "financing approval scheduled");
    }

    /// Stops the timer and drops an approval that fired but was not pumped.
    fn cancel_approval(&mut self) {
        if let Some(handle) = self.approval_timer.take() {
            handle.abort();
            debug!("financing approval cancelled");
        }
        let mut stale = 0;
        while self.events_rx.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "queued approval discarded");
        }
    }

    fn car_id(&self) -> Result<String, SessionError> {
        self.car
            .as_ref()
            .map(|car| car.id.clone())
            .ok_or(SessionError::NoCarLoaded)
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        self.cancel_approval();
    }
}

/// Last non-empty path segment of `url`, ignoring scheme, host and query.
fn session_id_from_url(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => without_query,
    };
    path.split('/').rev().find(|segment| !segment.is_empty())
}
