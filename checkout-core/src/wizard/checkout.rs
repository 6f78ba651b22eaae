//! The checkout wizard reducer.
//!
//! [`CheckoutWizard::dispatch`] is the only way to change wizard state. Each
//! event is applied to a copy of the state; the copy replaces the live state
//! only when the event is accepted, so a rejected event leaves nothing behind.
//!
//! # Step gates
//!
//! | Step                | Completed by |
//! |---------------------|--------------|
//! | Payment method      | bank transfer, pay in full, decline financing, or a submitted financing application |
//! | Car inspection      | billing address (bank transfer), paid order summary, or continue (financing must be approved) |
//! | Delivery            | continue with a pickup store or home location chosen |
//! | Additional services | continue (no gate) |
//! | Payment             | confirm with terms accepted |

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::forms::{BillingAddressForm, FieldError, FinancingApplication, FinancingApplicationForm};
use crate::wizard::{CheckoutSteps, WizardEffect, WizardEvent};
use crate::{DeliveryChoice, GeoPoint, PaymentMethod, ServiceKey, StepKey, StepStatus};

/// Delay before a submitted financing application is auto-approved.
pub const DEFAULT_APPROVAL_DELAY: Duration = Duration::from_secs(10);

/// Reasons an event was rejected. Wizard state is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("step '{step}' is {}, not active", .status.as_str())]
    StepNotActive { step: StepKey, status: StepStatus },

    #[error("step '{0}' has not been reached yet")]
    StepLocked(StepKey),

    #[error("checkout is already complete")]
    AlreadyComplete,

    /// A financing application was sent; the method can no longer change.
    #[error("payment method is locked to financing")]
    PaymentMethodLocked,

    #[error("financing is not the selected payment method")]
    FinancingNotSelected,

    #[error("a financing application was already sent")]
    ApplicationAlreadySent,

    #[error("consent to data processing is required")]
    ConsentRequired,

    #[error("form has {} invalid field(s)", .0.len())]
    InvalidForm(Vec<FieldError>),

    #[error("billing address form is not shown")]
    BillingFormNotShown,

    #[error("financing has not been approved yet")]
    FinancingNotApproved,

    #[error("terms and conditions must be accepted")]
    TermsNotAccepted,

    #[error("choose a pickup store or home delivery location first")]
    DeliveryNotSelected,
}

/// Which part of the financing panel is visible in the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinancingPanel {
    #[default]
    Hidden,
    /// The calculator.
    Specs,
    ApplicationForm,
}

/// State of one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutWizard {
    steps: CheckoutSteps,
    payment_method: Option<PaymentMethod>,
    financing_panel: FinancingPanel,
    billing_form_visible: bool,
    application: Option<FinancingApplication>,
    application_sent: bool,
    financing_approved: bool,
    billing_address: Option<BillingAddressForm>,
    inspection_order_paid: bool,
    delivery: Option<DeliveryChoice>,
    services: BTreeSet<ServiceKey>,
    terms_accepted: bool,
    approval_delay: Duration,
}

impl Default for CheckoutWizard {
    fn default() -> Self {
        Self::new(DEFAULT_APPROVAL_DELAY)
    }
}

impl CheckoutWizard {
    pub fn new(approval_delay: Duration) -> Self {
        Self {
            steps: CheckoutSteps::new(),
            payment_method: None,
            financing_panel: FinancingPanel::Hidden,
            billing_form_visible: false,
            application: None,
            application_sent: false,
            financing_approved: false,
            billing_address: None,
            inspection_order_paid: false,
            delivery: None,
            services: BTreeSet::new(),
            terms_accepted: false,
            approval_delay,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn steps(&self) -> &CheckoutSteps {
        &self.steps
    }

    pub fn status(
        &self,
        step: StepKey,
    ) -> StepStatus {
        self.steps.status(step)
    }

    pub fn active_step(&self) -> Option<StepKey> {
        self.steps.active_step()
    }

    pub fn is_complete(&self) -> bool {
        self.steps.is_complete()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn financing_panel(&self) -> FinancingPanel {
        self.financing_panel
    }

    pub fn billing_form_visible(&self) -> bool {
        self.billing_form_visible
    }

    pub fn application(&self) -> Option<&FinancingApplication> {
        self.application.as_ref()
    }

    pub fn application_sent(&self) -> bool {
        self.application_sent
    }

    pub fn financing_approved(&self) -> bool {
        self.financing_approved
    }

    pub fn billing_address(&self) -> Option<&BillingAddressForm> {
        self.billing_address.as_ref()
    }

    pub fn inspection_order_paid(&self) -> bool {
        self.inspection_order_paid
    }

    pub fn delivery(&self) -> Option<&DeliveryChoice> {
        self.delivery.as_ref()
    }

    pub fn selected_services(&self) -> &BTreeSet<ServiceKey> {
        &self.services
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn approval_delay(&self) -> Duration {
        self.approval_delay
    }

    // ─── Reducer ────────────────────────────────────────────────────────────

    /// Applies one event and returns the effects the caller must run.
    ///
    /// # Errors
    ///
    /// [`WizardError`] when a guard rejects the event; state is unchanged.
    pub fn dispatch(
        &mut self,
        event: WizardEvent,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        let name = event.name();
        let mut next = self.clone();

        match next.apply(event) {
            Ok(effects) => {
                *self = next;
                debug!(event = name, active = ?self.active_step(), "event applied");
                Ok(effects)
            }
            Err(e) => {
                warn!(event = name, error = %e, "event rejected");
                Err(e)
            }
        }
    }

    /// Checks a financing submission without applying it.
    ///
    /// Used to validate before the application is sent to the backend.
    pub fn check_financing_submission(
        &self,
        form: &FinancingApplicationForm,
        consent: bool,
    ) -> Result<FinancingApplication, WizardError> {
        if self.payment_method != Some(PaymentMethod::Financing) {
            return Err(WizardError::FinancingNotSelected);
        }
        if self.application_sent {
            return Err(WizardError::ApplicationAlreadySent);
        }
        if !consent {
            return Err(WizardError::ConsentRequired);
        }
        form.validate().map_err(WizardError::InvalidForm)
    }

    fn apply(
        &mut self,
        event: WizardEvent,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        match event {
            WizardEvent::SelectPaymentMethod {
                method: PaymentMethod::BankTransfer,
            } => self.choose_bank_transfer(),
            WizardEvent::SelectPaymentMethod {
                method: PaymentMethod::Financing,
            } => Ok(self.choose_financing()),
            WizardEvent::RequestFinancing => self.request_financing(),
            WizardEvent::SubmitFinancingApplication { form, consent } => {
                self.submit_application(&form, consent)
            }
            WizardEvent::FinancingApproved => Ok(self.approve_financing()),
            WizardEvent::PayInFull | WizardEvent::DeclineFinancing => self.choose_bank_transfer(),
            WizardEvent::CompleteBillingAddress { form } => self.complete_billing_address(form),
            WizardEvent::CompleteOrderSummary { terms_accepted } => {
                self.complete_order_summary(terms_accepted)
            }
            WizardEvent::ContinueFromInspection => self.continue_from_inspection(),
            WizardEvent::SelectPickupStore { store_id } => self.select_pickup_store(store_id),
            WizardEvent::SetHomeDelivery { location } => self.set_home_delivery(location),
            WizardEvent::ContinueFromDelivery => self.continue_from_delivery(),
            WizardEvent::ToggleService { service } => self.toggle_service(service),
            WizardEvent::ContinueFromAdditionalServices => {
                self.advance(StepKey::AdditionalServices)
            }
            WizardEvent::SetTermsAccepted { accepted } => {
                self.steps.ensure_reached(StepKey::FinalPayment)?;
                self.terms_accepted = accepted;
                Ok(Vec::new())
            }
            WizardEvent::ConfirmFinalPayment => self.confirm_final_payment(),
            WizardEvent::ToggleExpanded { step } => {
                self.steps.toggle_expanded(step)?;
                Ok(Vec::new())
            }
            WizardEvent::Restart => Ok(self.restart()),
        }
    }

    // ─── Step 1: payment method ─────────────────────────────────────────────

    fn choose_bank_transfer(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        if self.application_sent {
            return Err(WizardError::PaymentMethodLocked);
        }

        self.payment_method = Some(PaymentMethod::BankTransfer);
        self.financing_panel = FinancingPanel::Hidden;
        self.billing_form_visible = true;

        let mut effects = vec![WizardEffect::ResetFinancingForm, WizardEffect::ShowBillingForm];
        if self.status(StepKey::Payment) == StepStatus::Active {
            effects.extend(self.advance(StepKey::Payment)?);
        }
        Ok(effects)
    }

    fn choose_financing(&mut self) -> Vec<WizardEffect> {
        if self.payment_method == Some(PaymentMethod::Financing) && self.application_sent {
            return Vec::new();
        }

        self.payment_method = Some(PaymentMethod::Financing);
        self.billing_form_visible = false;
        if self.financing_panel == FinancingPanel::Hidden {
            self.financing_panel = FinancingPanel::Specs;
        }
        Vec::new()
    }

    fn request_financing(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        if self.payment_method != Some(PaymentMethod::Financing) {
            return Err(WizardError::FinancingNotSelected);
        }
        self.financing_panel = FinancingPanel::ApplicationForm;
        Ok(Vec::new())
    }

    fn submit_application(
        &mut self,
        form: &FinancingApplicationForm,
        consent: bool,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        let application = self.check_financing_submission(form, consent)?;

        self.application = Some(application);
        self.application_sent = true;
        self.financing_panel = FinancingPanel::ApplicationForm;
        info!("financing application sent");

        let mut effects = vec![WizardEffect::ScheduleApproval(self.approval_delay)];
        if self.status(StepKey::Payment) == StepStatus::Active {
            effects.extend(self.advance(StepKey::Payment)?);
        }
        Ok(effects)
    }

    fn approve_financing(&mut self) -> Vec<WizardEffect> {
        if !self.application_sent {
            debug!("approval without a sent application ignored");
            return Vec::new();
        }
        if !self.financing_approved {
            info!("financing approved");
        }
        self.financing_approved = true;
        Vec::new()
    }

    // ─── Step 2: inspection ─────────────────────────────────────────────────

    fn complete_billing_address(
        &mut self,
        form: BillingAddressForm,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        if self.payment_method != Some(PaymentMethod::BankTransfer) || !self.billing_form_visible {
            return Err(WizardError::BillingFormNotShown);
        }
        self.steps.ensure_active(StepKey::Inspection)?;
        form.validate().map_err(WizardError::InvalidForm)?;

        self.billing_address = Some(form);
        self.advance(StepKey::Inspection)
    }

    fn complete_order_summary(
        &mut self,
        terms_accepted: bool,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_active(StepKey::Inspection)?;
        if !terms_accepted {
            return Err(WizardError::TermsNotAccepted);
        }

        self.inspection_order_paid = true;
        self.advance(StepKey::Inspection)
    }

    fn continue_from_inspection(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_active(StepKey::Inspection)?;
        if self.payment_method == Some(PaymentMethod::Financing) && !self.financing_approved {
            return Err(WizardError::FinancingNotApproved);
        }
        self.advance(StepKey::Inspection)
    }

    // ─── Step 3: delivery ───────────────────────────────────────────────────

    fn select_pickup_store(
        &mut self,
        store_id: String,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_reached(StepKey::Delivery)?;
        let store_id = store_id.trim();
        if store_id.is_empty() {
            return Err(WizardError::InvalidForm(vec![FieldError::new(
                "store_id",
                "is required",
            )]));
        }

        self.delivery = Some(DeliveryChoice::Pickup {
            store_id: store_id.to_string(),
        });
        Ok(Vec::new())
    }

    fn set_home_delivery(
        &mut self,
        location: GeoPoint,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_reached(StepKey::Delivery)?;
        self.delivery = Some(DeliveryChoice::Home { location });
        Ok(Vec::new())
    }

    fn continue_from_delivery(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_active(StepKey::Delivery)?;
        if self.delivery.is_none() {
            return Err(WizardError::DeliveryNotSelected);
        }
        self.advance(StepKey::Delivery)
    }

    // ─── Step 4 and 5 ───────────────────────────────────────────────────────

    fn toggle_service(
        &mut self,
        service: ServiceKey,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_reached(StepKey::AdditionalServices)?;
        if !self.services.remove(&service) {
            self.services.insert(service);
        }
        Ok(Vec::new())
    }

    fn confirm_final_payment(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        self.steps.ensure_active(StepKey::FinalPayment)?;
        if !self.terms_accepted {
            return Err(WizardError::TermsNotAccepted);
        }
        self.advance(StepKey::FinalPayment)
    }

    fn restart(&mut self) -> Vec<WizardEffect> {
        *self = Self::new(self.approval_delay);
        vec![
            WizardEffect::CancelApproval,
            WizardEffect::ResetFinancingForm,
            WizardEffect::ScrollIntoView(StepKey::Payment),
        ]
    }

    fn advance(
        &mut self,
        from: StepKey,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        let next = self.steps.advance(from)?;
        info!(step = %from, "step completed");
        Ok(next.map(WizardEffect::ScrollIntoView).into_iter().collect())
    }
}
