mod car;
mod charges;
mod checkout;
mod financing_product;

pub use car::CarRecord;
pub use charges::{ChargeSchedule, Charges};
pub use checkout::{
    DeliveryChoice, GeoPoint, InspectionSession, PaymentMethod, ServiceKey, StepKey, StepStatus,
};
pub use financing_product::{FinancingProduct, PeriodDomain, ProductTerms};
