pub mod backend;
pub mod calculations;
pub mod forms;
pub mod models;
pub mod session;
pub mod wizard;

pub use backend::{
    BackendConfig, BackendError, BackendFactory, BackendRegistry, InventoryStore,
    MarketplaceBackend,
};
pub use calculations::{
    FinancingCalculator, FinancingError, FinancingPreset, FinancingQuote, FinancingTable,
};
pub use models::*;
pub use session::{CheckoutSession, Navigate, SessionError};
pub use wizard::{CheckoutWizard, WizardEffect, WizardError, WizardEvent};
