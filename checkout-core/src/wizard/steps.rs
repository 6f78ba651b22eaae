use std::collections::BTreeSet;

use crate::wizard::WizardError;
use crate::{StepKey, StepStatus};

/// Status of the five checkout steps.
///
/// Statuses only move forward: `locked → active → completed`. At most one
/// step is active, and it is always the first step that is not completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSteps {
    statuses: [StepStatus; 5],
    expanded: BTreeSet<StepKey>,
}

impl Default for CheckoutSteps {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSteps {
    /// Payment active and expanded, everything else locked.
    pub fn new() -> Self {
        let mut statuses = [StepStatus::Locked; 5];
        statuses[StepKey::Payment.index()] = StepStatus::Active;
        Self {
            statuses,
            expanded: BTreeSet::from([StepKey::Payment]),
        }
    }

    pub fn status(
        &self,
        step: StepKey,
    ) -> StepStatus {
        self.statuses[step.index()]
    }

    /// `None` once every step is completed.
    pub fn active_step(&self) -> Option<StepKey> {
        StepKey::ALL
            .into_iter()
            .find(|step| self.status(*step) == StepStatus::Active)
    }

    pub fn is_complete(&self) -> bool {
        self.statuses.iter().all(|s| *s == StepStatus::Completed)
    }

    pub fn is_expanded(
        &self,
        step: StepKey,
    ) -> bool {
        self.expanded.contains(&step)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepKey, StepStatus)> + '_ {
        StepKey::ALL.into_iter().map(|step| (step, self.status(step)))
    }

    /// Fails with [`WizardError::StepLocked`] for locked steps.
    pub fn ensure_reached(
        &self,
        step: StepKey,
    ) -> Result<(), WizardError> {
        if self.status(step) == StepStatus::Locked {
            Err(WizardError::StepLocked(step))
        } else {
            Ok(())
        }
    }

    pub fn ensure_active(
        &self,
        step: StepKey,
    ) -> Result<(), WizardError> {
        if self.is_complete() {
            return Err(WizardError::AlreadyComplete);
        }
        match self.status(step) {
            StepStatus::Active => Ok(()),
            status => Err(WizardError::StepNotActive { step, status }),
        }
    }

    /// Completes `from` and activates its successor, returning the successor.
    ///
    /// For the last step nothing is activated and `None` is returned.
    pub fn advance(
        &mut self,
        from: StepKey,
    ) -> Result<Option<StepKey>, WizardError> {
        self.ensure_active(from)?;

        self.statuses[from.index()] = StepStatus::Completed;
        let next = from.next();
        if let Some(next) = next {
            self.statuses[next.index()] = StepStatus::Active;
            self.expanded.insert(next);
        }
        Ok(next)
    }

    /// View-only expand/collapse. Returns the new expanded flag.
    pub fn toggle_expanded(
        &mut self,
        step: StepKey,
    ) -> Result<bool, WizardError> {
        self.ensure_reached(step)?;
        if self.expanded.remove(&step) {
            Ok(false)
        } else {
            self.expanded.insert(step);
            Ok(true)
        }
    }
}
