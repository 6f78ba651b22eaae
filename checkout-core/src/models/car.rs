use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarRecord {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub mileage: Decimal,
    pub year: i32,

    /// Engine power in kW.
    pub power: Option<i32>,
    pub fuel: Option<String>,
    pub gear: Option<String>,
    pub country: Option<String>,

    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl CarRecord {
    /// Short "Brand Model (year)" label used in log lines and CLI output.
    pub fn title(&self) -> String {
        format!("{} {} ({})", self.brand, self.model, self.year)
    }
}
