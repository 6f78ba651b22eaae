use std::io::Read;

use checkout_core::{BackendError, CarRecord, InventoryStore};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Separator used inside the `images` and `features` columns.
pub const LIST_SEPARATOR: char = '|';

/// Errors that can occur when loading car inventory.
#[derive(Debug, Error)]
pub enum InventoryLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid car '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<csv::Error> for InventoryLoaderError {
    fn from(err: csv::Error) -> Self {
        InventoryLoaderError::CsvParse(err.to_string())
    }
}

/// A single row from the inventory CSV file.
///
/// Columns: `id, brand, model, price, mileage, year, power, fuel, gear,
/// country, images, features`. `power`, `fuel`, `gear` and `country` may be
/// empty. `images` and `features` hold `|`-separated lists.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CarCsvRecord {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub mileage: Decimal,
    pub year: i32,
    pub power: Option<i32>,
    pub fuel: Option<String>,
    pub gear: Option<String>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub features: Vec<String>,
}

fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| {
        s.split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default())
}

impl CarCsvRecord {
    fn validate(&self) -> Result<(), InventoryLoaderError> {
        let invalid = |reason: &str| InventoryLoaderError::InvalidRecord {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id is required"));
        }
        if self.brand.trim().is_empty() || self.model.trim().is_empty() {
            return Err(invalid("brand and model are required"));
        }
        if self.price.is_sign_negative() {
            return Err(invalid("price must not be negative"));
        }
        if self.mileage.is_sign_negative() {
            return Err(invalid("mileage must not be negative"));
        }
        Ok(())
    }

    pub fn into_car(self) -> CarRecord {
        CarRecord {
            id: self.id.trim().to_string(),
            brand: self.brand.trim().to_string(),
            model: self.model.trim().to_string(),
            price: self.price,
            mileage: self.mileage,
            year: self.year,
            power: self.power,
            fuel: self.fuel,
            gear: self.gear,
            country: self.country,
            images: self.images,
            features: self.features,
        }
    }
}

/// Loader for car inventory from CSV files.
///
/// Records are written through [`InventoryStore`], so any backend that can
/// store cars works.
pub struct CarInventoryLoader;

impl CarInventoryLoader {
    /// Parse and validate inventory records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<CarCsvRecord>, InventoryLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: CarCsvRecord = result?;
            record.validate()?;
            records.push(record);
        }

        Ok(records)
    }

    /// Upsert every record. Loading the same file twice leaves the same
    /// inventory behind.
    pub async fn load<S: InventoryStore + ?Sized>(
        store: &S,
        records: &[CarCsvRecord],
    ) -> Result<usize, InventoryLoaderError> {
        let mut loaded = 0;
        for record in records {
            let car = record.clone().into_car();
            store.upsert_car(&car).await?;
            debug!(car_id = %car.id, "car loaded");
            loaded += 1;
        }
        Ok(loaded)
    }
}
