//! Order charges for a single car.
//!
//! The car price is treated as VAT-inclusive for the `price_without_vat`
//! figure, yet the VAT amount is still added on top in the total. Both figures
//! are rounded to cents; the fixed components come from a [`ChargeSchedule`].
//!
//! | Field               | Formula |
//! |---------------------|---------|
//! | price_without_vat   | `price / (1 + vat / 100)` |
//! | vat_amount          | `price − price_without_vat` |
//! | delivery            | flat [`DELIVERY_CHARGE`] when a zipcode and car country are known |
//! | total_price         | `price + vat_amount + services + inspection + delivery + registration + pre_delivery + fuel + warranty` |

use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::{ChargeSchedule, Charges};

/// Placeholder distance-based delivery charge (100 km at 1 per km).
pub const DELIVERY_CHARGE: Decimal = Decimal::ONE_HUNDRED;

/// Delivery charge for a car located in `car_country` shipped to `zipcode`.
pub fn delivery_charge(
    car_country: Option<&str>,
    zipcode: Option<&str>,
) -> Decimal {
    let known = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
    if known(car_country) && known(zipcode) {
        DELIVERY_CHARGE
    } else {
        Decimal::ZERO
    }
}

/// Builds the charge breakdown for one car.
pub fn compute_charges(
    car_price: Decimal,
    car_country: Option<&str>,
    schedule: &ChargeSchedule,
    zipcode: Option<&str>,
) -> Charges {
    let price_without_vat = car_price / (Decimal::ONE + schedule.vat / Decimal::ONE_HUNDRED);
    let vat_amount = car_price - price_without_vat;
    let delivery = delivery_charge(car_country, zipcode);

    let total = car_price
        + vat_amount
        + schedule.services_total
        + schedule.car_inspection
        + delivery
        + schedule.registration_tax
        + schedule.pre_delivery_prep
        + schedule.fuel
        + schedule.extended_warranty;

    Charges {
        car_price,
        price_without_vat: round_half_up(price_without_vat),
        vat_percentage: schedule.vat,
        services_total: schedule.services_total,
        car_inspection: schedule.car_inspection,
        delivery,
        registration_tax: schedule.registration_tax,
        pre_delivery_prep: schedule.pre_delivery_prep,
        fuel: schedule.fuel,
        extended_warranty: schedule.extended_warranty,
        total_price: round_half_up(total),
    }
}
