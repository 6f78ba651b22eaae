use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use checkout_core::calculations::compute_charges;
use checkout_core::forms::FinancingApplication;
use checkout_core::{
    BackendError, CarRecord, ChargeSchedule, Charges, InspectionSession, InventoryStore,
    MarketplaceBackend,
};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::decimal::{decimal_to_f64, get_decimal};

const MEMORY: &str = ":memory:";

/// At most this many cars are returned by `get_similar_cars`.
pub const SIMILAR_CARS_LIMIT: i64 = 5;

pub struct SqliteBackend {
    pool: SqlitePool,
    checkout_base_url: String,
}

impl SqliteBackend {
    /// Opens `connection_string`, either a file path (created if missing) or
    /// `":memory:"`.
    ///
    /// An in-memory database lives only as long as its connection, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn new(
        connection_string: &str,
        checkout_base_url: &str,
    ) -> Result<Self> {
        let pool = if connection_string == MEMORY {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await
        } else {
            let path = connection_string
                .strip_prefix("sqlite://")
                .or_else(|| connection_string.strip_prefix("sqlite:"))
                .unwrap_or(connection_string);
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await
        }
        .with_context(|| format!("Failed to connect to database: {connection_string}"))?;

        Ok(Self::new_with_pool(pool, checkout_base_url))
    }

    pub fn new_with_pool(
        pool: SqlitePool,
        checkout_base_url: &str,
    ) -> Self {
        Self {
            pool,
            checkout_base_url: checkout_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "seed applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn list_strings(
        &self,
        sql: &str,
        car_id: &str,
    ) -> Result<Vec<String>, BackendError> {
        let rows = sqlx::query(sql)
            .bind(car_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackendError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get(0)
                    .map_err(|e| BackendError::Database(e.to_string()))
            })
            .collect()
    }

    /// Fills in images and features for a bare `car` row.
    async fn hydrate_car(
        &self,
        row: &SqliteRow,
    ) -> Result<CarRecord, BackendError> {
        let mut car = row_to_car(row)?;
        car.images = self
            .list_strings(
                "SELECT url FROM car_image WHERE car_id = ? ORDER BY position",
                &car.id,
            )
            .await?;
        car.features = self
            .list_strings(
                "SELECT feature FROM car_feature WHERE car_id = ? ORDER BY position",
                &car.id,
            )
            .await?;
        Ok(car)
    }
}

fn row_to_car(row: &SqliteRow) -> Result<CarRecord, BackendError> {
    let db = |e: sqlx::Error| BackendError::Database(e.to_string());
    Ok(CarRecord {
        id: row.try_get("id").map_err(db)?,
        brand: row.try_get("brand").map_err(db)?,
        model: row.try_get("model").map_err(db)?,
        price: get_decimal(row, "price")?,
        mileage: get_decimal(row, "mileage")?,
        year: row.try_get("year").map_err(db)?,
        power: row.try_get("power").map_err(db)?,
        fuel: row.try_get("fuel").map_err(db)?,
        gear: row.try_get("gear").map_err(db)?,
        country: row.try_get("country").map_err(db)?,
        images: Vec::new(),
        features: Vec::new(),
    })
}

const CAR_COLUMNS: &str = "id, brand, model, price, mileage, year, power, fuel, gear, country";

#[async_trait]
impl MarketplaceBackend for SqliteBackend {
    async fn get_car(
        &self,
        id: &str,
    ) -> Result<CarRecord, BackendError> {
        let row = sqlx::query(&format!("SELECT {CAR_COLUMNS} FROM car WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BackendError::Database(e.to_string()))?
            .ok_or_else(|| BackendError::NotFound(format!("car '{id}'")))?;

        self.hydrate_car(&row).await
    }

    async fn get_similar_cars(
        &self,
        id: &str,
    ) -> Result<Vec<CarRecord>, BackendError> {
        let car = self.get_car(id).await?;

        let rows = sqlx::query(&format!(
            "SELECT {CAR_COLUMNS} FROM car
             WHERE brand = ? AND model = ? AND id != ?
             ORDER BY ABS(price - ?), id
             LIMIT ?"
        ))
        .bind(&car.brand)
        .bind(&car.model)
        .bind(&car.id)
        .bind(decimal_to_f64(car.price))
        .bind(SIMILAR_CARS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BackendError::Database(e.to_string()))?;

        let mut similar = Vec::with_capacity(rows.len());
        for row in &rows {
            similar.push(self.hydrate_car(row).await?);
        }
        Ok(similar)
    }

    async fn get_charges(
        &self,
        car_id: &str,
        zipcode: Option<&str>,
    ) -> Result<Charges, BackendError> {
        let car = self.get_car(car_id).await?;
        let schedule = self.get_charge_schedule().await?;
        Ok(compute_charges(
            car.price,
            car.country.as_deref(),
            &schedule,
            zipcode,
        ))
    }

    async fn create_inspection_session(
        &self,
        car_id: &str,
    ) -> Result<InspectionSession, BackendError> {
        // Fails with NotFound before a session row is written.
        self.get_car(car_id).await?;

        let session_id = format!("cs_{}", uuid::Uuid::new_v4().simple());
        let checkout_url = format!("{}/inspection/{session_id}", self.checkout_base_url);

        sqlx::query(
            "INSERT INTO inspection_session (id, car_id, checkout_url, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&session_id)
        .bind(car_id)
        .bind(&checkout_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BackendError::Database(e.to_string()))?;

        info!(car_id, session_id = %session_id, "inspection session created");
        Ok(InspectionSession { checkout_url })
    }

    async fn apply_finance(
        &self,
        car_id: &str,
        application: &FinancingApplication,
    ) -> Result<(), BackendError> {
        self.get_car(car_id).await?;

        sqlx::query(
            "INSERT INTO finance_application (
                car_id, name, surname, telephone_number, email,
                identification_number, date_of_birth, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(car_id)
        .bind(&application.name)
        .bind(&application.surname)
        .bind(&application.telephone_number)
        .bind(&application.email)
        .bind(&application.identification_number)
        .bind(application.date_of_birth)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BackendError::Database(e.to_string()))?;

        info!(car_id, "financing application stored");
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for SqliteBackend {
    async fn upsert_car(
        &self,
        car: &CarRecord,
    ) -> Result<(), BackendError> {
        let db = |e: sqlx::Error| BackendError::Database(e.to_string());
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            "INSERT INTO car (id, brand, model, price, mileage, year, power, fuel, gear, country, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                brand = excluded.brand, model = excluded.model, price = excluded.price,
                mileage = excluded.mileage, year = excluded.year, power = excluded.power,
                fuel = excluded.fuel, gear = excluded.gear, country = excluded.country,
                updated_at = excluded.updated_at",
        )
        .bind(&car.id)
        .bind(&car.brand)
        .bind(&car.model)
        .bind(decimal_to_f64(car.price))
        .bind(decimal_to_f64(car.mileage))
        .bind(car.year)
        .bind(car.power)
        .bind(&car.fuel)
        .bind(&car.gear)
        .bind(&car.country)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        sqlx::query("DELETE FROM car_image WHERE car_id = ?")
            .bind(&car.id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        for (position, url) in car.images.iter().enumerate() {
            sqlx::query("INSERT INTO car_image (car_id, position, url) VALUES (?, ?, ?)")
                .bind(&car.id)
                .bind(position as i64)
                .bind(url)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        sqlx::query("DELETE FROM car_feature WHERE car_id = ?")
            .bind(&car.id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        for (position, feature) in car.features.iter().enumerate() {
            sqlx::query("INSERT INTO car_feature (car_id, position, feature) VALUES (?, ?, ?)")
                .bind(&car.id)
                .bind(position as i64)
                .bind(feature)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        debug!(car = %car.title(), "car upserted");
        Ok(())
    }

    async fn count_cars(&self) -> Result<i64, BackendError> {
        sqlx::query("SELECT COUNT(*) AS n FROM car")
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("n"))
            .map_err(|e| BackendError::Database(e.to_string()))
    }

    async fn get_charge_schedule(&self) -> Result<ChargeSchedule, BackendError> {
        let row = sqlx::query(
            "SELECT vat, services_total, car_inspection, registration_tax,
                    pre_delivery_prep, fuel, extended_warranty
             FROM additional_charges WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BackendError::Database(e.to_string()))?;

        let Some(row) = row else {
            warn!("no charges row found, using default values");
            let schedule = ChargeSchedule::default();
            self.update_charge_schedule(&schedule).await?;
            return Ok(schedule);
        };

        Ok(ChargeSchedule {
            vat: get_decimal(&row, "vat")?,
            services_total: get_decimal(&row, "services_total")?,
            car_inspection: get_decimal(&row, "car_inspection")?,
            registration_tax: get_decimal(&row, "registration_tax")?,
            pre_delivery_prep: get_decimal(&row, "pre_delivery_prep")?,
            fuel: get_decimal(&row, "fuel")?,
            extended_warranty: get_decimal(&row, "extended_warranty")?,
        })
    }

    async fn update_charge_schedule(
        &self,
        schedule: &ChargeSchedule,
    ) -> Result<(), BackendError> {
        sqlx::query(
            "INSERT INTO additional_charges (
                id, vat, services_total, car_inspection, registration_tax,
                pre_delivery_prep, fuel, extended_warranty
            ) VALUES (1, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                vat = excluded.vat, services_total = excluded.services_total,
                car_inspection = excluded.car_inspection,
                registration_tax = excluded.registration_tax,
                pre_delivery_prep = excluded.pre_delivery_prep,
                fuel = excluded.fuel, extended_warranty = excluded.extended_warranty",
        )
        .bind(decimal_to_f64(schedule.vat))
        .bind(decimal_to_f64(schedule.services_total))
        .bind(decimal_to_f64(schedule.car_inspection))
        .bind(decimal_to_f64(schedule.registration_tax))
        .bind(decimal_to_f64(schedule.pre_delivery_prep))
        .bind(decimal_to_f64(schedule.fuel))
        .bind(decimal_to_f64(schedule.extended_warranty))
        .execute(&self.pool)
        .await
        .map_err(|e| BackendError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use super::*;

    async fn setup_test_db() -> SqliteBackend {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let backend = SqliteBackend::new_with_pool(pool, "https://pay.example.com/");
        backend
            .run_migrations()
            .await
            .expect("Failed to run migrations");
        backend
    }

    fn car(
        id: &str,
        brand: &str,
        model: &str,
        price: Decimal,
    ) -> CarRecord {
        CarRecord {
            id: id.to_string(),
            brand: brand.to_string(),
            model: model.to_string(),
            price,
            mileage: dec!(30000),
            year: 2021,
            power: Some(110),
            fuel: Some("diesel".to_string()),
            gear: Some("manual".to_string()),
            country: Some("AT".to_string()),
            images: vec![],
            features: vec![],
        }
    }

    async fn insert_octavias(backend: &SqliteBackend) {
        for (id, price) in [
            ("oct-1", dec!(27440)),
            ("oct-2", dec!(27000)),
            ("oct-3", dec!(35000)),
            ("oct-4", dec!(26000)),
        ] {
            backend
                .upsert_car(&car(id, "Skoda", "Octavia", price))
                .await
                .expect("Failed to insert car");
        }
        backend
            .upsert_car(&car("golf-1", "Volkswagen", "Golf", dec!(27440)))
            .await
            .expect("Failed to insert car");
    }

    fn application() -> FinancingApplication {
        FinancingApplication {
            name: "Anna".to_string(),
            surname: "Huber".to_string(),
            telephone_number: "+436601234567".to_string(),
            email: "anna.huber@example.at".to_string(),
            identification_number: "AB123456".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1988, 3, 14).unwrap(),
        }
    }

    // =========================================================================
    // cars
    // =========================================================================

    #[tokio::test]
    async fn upsert_and_get_car_with_lists() {
        let backend = setup_test_db().await;
        let mut record = car("oct-1", "Skoda", "Octavia", dec!(27440));
        record.images = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        record.features = vec!["Navigation".to_string()];

        backend.upsert_car(&record).await.unwrap();
        let loaded = backend.get_car("oct-1").await.unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_car() {
        let backend = setup_test_db().await;
        let mut record = car("oct-1", "Skoda", "Octavia", dec!(27440));
        record.images = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        backend.upsert_car(&record).await.unwrap();

        record.price = dec!(26500);
        record.images = vec!["c.jpg".to_string()];
        backend.upsert_car(&record).await.unwrap();

        let loaded = backend.get_car("oct-1").await.unwrap();
        assert_eq!(loaded.price, dec!(26500));
        assert_eq!(loaded.images, vec!["c.jpg".to_string()]);
        assert_eq!(backend.count_cars().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_missing_car_is_not_found() {
        let backend = setup_test_db().await;

        assert_eq!(
            backend.get_car("nope").await,
            Err(BackendError::NotFound("car 'nope'".to_string()))
        );
    }

    #[tokio::test]
    async fn similar_cars_share_brand_and_model_closest_price_first() {
        let backend = setup_test_db().await;
        insert_octavias(&backend).await;

        let similar = backend.get_similar_cars("oct-1").await.unwrap();
        let ids: Vec<_> = similar.iter().map(|c| c.id.as_str()).collect();

        assert_eq!(ids, vec!["oct-2", "oct-4", "oct-3"]);
    }

    #[tokio::test]
    async fn similar_cars_capped() {
        let backend = setup_test_db().await;
        for i in 0..8 {
            backend
                .upsert_car(&car(&format!("oct-{i}"), "Skoda", "Octavia", dec!(20000) + Decimal::from(i)))
                .await
                .unwrap();
        }

        let similar = backend.get_similar_cars("oct-0").await.unwrap();

        assert_eq!(similar.len() as i64, SIMILAR_CARS_LIMIT);
    }

    // =========================================================================
    // charges
    // =========================================================================

    #[tokio::test]
    async fn charges_fall_back_to_default_schedule() {
        let backend = setup_test_db().await;
        insert_octavias(&backend).await;

        let charges = backend.get_charges("oct-1", None).await.unwrap();

        assert_eq!(charges.vat_percentage, dec!(22));
        assert_eq!(charges.services_total, dec!(1111));
        assert_eq!(charges.price_without_vat, dec!(22491.80));
        assert_eq!(charges.total_price, dec!(34610.20));
        assert_eq!(
            backend.get_charge_schedule().await.unwrap(),
            ChargeSchedule::default()
        );
    }

    #[tokio::test]
    async fn charges_use_stored_schedule_and_delivery() {
        let backend = setup_test_db().await;
        insert_octavias(&backend).await;
        let schedule = ChargeSchedule {
            vat: dec!(20),
            extended_warranty: dec!(450),
            ..ChargeSchedule::default()
        };
        backend.update_charge_schedule(&schedule).await.unwrap();

        let charges = backend.get_charges("oct-1", Some("1010")).await.unwrap();

        assert_eq!(charges.vat_percentage, dec!(20));
        assert_eq!(charges.extended_warranty, dec!(450));
        assert_eq!(charges.delivery, dec!(100));
    }

    // =========================================================================
    // payments
    // =========================================================================

    #[tokio::test]
    async fn inspection_session_url_ends_with_stored_id() {
        let backend = setup_test_db().await;
        insert_octavias(&backend).await;

        let session = backend.create_inspection_session("oct-1").await.unwrap();

        let id = session
            .checkout_url
            .strip_prefix("https://pay.example.com/inspection/")
            .expect("url should use the configured base");
        let stored: String = sqlx::query("SELECT car_id FROM inspection_session WHERE id = ?")
            .bind(id)
            .fetch_one(backend.pool())
            .await
            .unwrap()
            .get("car_id");
        assert_eq!(stored, "oct-1");
    }

    #[tokio::test]
    async fn inspection_session_for_unknown_car_fails() {
        let backend = setup_test_db().await;

        assert!(matches!(
            backend.create_inspection_session("nope").await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn finance_application_is_stored() {
        let backend = setup_test_db().await;
        insert_octavias(&backend).await;

        backend.apply_finance("oct-1", &application()).await.unwrap();

        let row = sqlx::query("SELECT telephone_number, date_of_birth FROM finance_application")
            .fetch_one(backend.pool())
            .await
            .unwrap();
        let phone: String = row.get("telephone_number");
        let dob: NaiveDate = row.get("date_of_birth");
        assert_eq!(phone, "+436601234567");
        assert_eq!(dob, NaiveDate::from_ymd_opt(1988, 3, 14).unwrap());
    }

    #[tokio::test]
    async fn memory_connection_string_keeps_data_across_queries() {
        let backend = SqliteBackend::new(":memory:", "https://pay.example.com")
            .await
            .unwrap();
        backend.run_migrations().await.unwrap();

        backend
            .upsert_car(&car("oct-1", "Skoda", "Octavia", dec!(27440)))
            .await
            .unwrap();

        assert_eq!(backend.count_cars().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn seeds_load_demo_inventory() {
        let backend = setup_test_db().await;
        let seeds = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds");

        backend.run_seeds(&seeds).await.unwrap();
        // Seeds are idempotent.
        backend.run_seeds(&seeds).await.unwrap();

        assert_eq!(backend.count_cars().await.unwrap(), 4);
        let car = backend.get_car("demo-octavia-1").await.unwrap();
        assert_eq!(car.images.len(), 2);
        assert_eq!(car.features, vec!["Navigation".to_string(), "Heated seats".to_string()]);
    }
}
