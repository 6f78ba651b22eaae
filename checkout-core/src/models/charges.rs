use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price breakdown for one car, as returned by the charges endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charges {
    pub car_price: Decimal,
    pub price_without_vat: Decimal,
    pub vat_percentage: Decimal,
    pub services_total: Decimal,
    pub car_inspection: Decimal,
    pub delivery: Decimal,
    pub registration_tax: Decimal,
    pub pre_delivery_prep: Decimal,
    pub fuel: Decimal,
    pub extended_warranty: Decimal,
    pub total_price: Decimal,
}

/// Configurable charge components stored by the backend.
///
/// The car price and delivery are per-request; everything else comes from
/// this single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSchedule {
    pub vat: Decimal,
    pub services_total: Decimal,
    pub car_inspection: Decimal,
    pub registration_tax: Decimal,
    pub pre_delivery_prep: Decimal,
    pub fuel: Decimal,
    pub extended_warranty: Decimal,
}

impl Default for ChargeSchedule {
    fn default() -> Self {
        Self {
            vat: Decimal::from(22),
            services_total: Decimal::from(1111),
            car_inspection: Decimal::from(119),
            registration_tax: Decimal::from(293),
            pre_delivery_prep: Decimal::from(699),
            fuel: Decimal::ZERO,
            extended_warranty: Decimal::ZERO,
        }
    }
}

impl fmt::Display for Charges {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Car price:          {}", self.car_price)?;
        writeln!(f, "Price without VAT:  {}", self.price_without_vat)?;
        writeln!(f, "VAT %:              {}", self.vat_percentage)?;
        writeln!(f, "Services:           {}", self.services_total)?;
        writeln!(f, "Car inspection:     {}", self.car_inspection)?;
        writeln!(f, "Delivery:           {}", self.delivery)?;
        writeln!(f, "Registration tax:   {}", self.registration_tax)?;
        writeln!(f, "Pre-delivery prep:  {}", self.pre_delivery_prep)?;
        writeln!(f, "Fuel:               {}", self.fuel)?;
        writeln!(f, "Extended warranty:  {}", self.extended_warranty)?;
        write!(f, "Total price:        {}", self.total_price)
    }
}
