use async_trait::async_trait;
use thiserror::Error;

use crate::forms::FinancingApplication;
use crate::models::{CarRecord, ChargeSchedule, Charges, InspectionSession};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Everything the checkout needs from the marketplace.
#[async_trait]
pub trait MarketplaceBackend: Send + Sync {
    // Cars
    async fn get_car(&self, id: &str) -> Result<CarRecord, BackendError>;
    async fn get_similar_cars(&self, id: &str) -> Result<Vec<CarRecord>, BackendError>;

    // Charges
    async fn get_charges(
        &self,
        car_id: &str,
        zipcode: Option<&str>,
    ) -> Result<Charges, BackendError>;

    // Payments
    async fn create_inspection_session(
        &self,
        car_id: &str,
    ) -> Result<InspectionSession, BackendError>;

    async fn apply_finance(
        &self,
        car_id: &str,
        application: &FinancingApplication,
    ) -> Result<(), BackendError>;
}

/// Write side used by the inventory loader and admin tooling.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inserts the car, or replaces it (images and features included).
    async fn upsert_car(&self, car: &CarRecord) -> Result<(), BackendError>;

    async fn count_cars(&self) -> Result<i64, BackendError>;

    async fn get_charge_schedule(&self) -> Result<ChargeSchedule, BackendError>;
    async fn update_charge_schedule(&self, schedule: &ChargeSchedule) -> Result<(), BackendError>;
}
