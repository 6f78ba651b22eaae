//! Money columns are stored as SQLite `REAL` (or `INTEGER` when a seed file
//! writes whole numbers); these helpers convert them to and from [`Decimal`].

use checkout_core::BackendError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

fn db_err(message: String) -> BackendError {
    BackendError::Database(message)
}

/// Reads a numeric column as a [`Decimal`]. `NULL` reads as zero.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, BackendError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| db_err(format!("Column '{column}' not found: {e}")))?;

    let type_name = value_ref.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row
                .try_get(column)
                .map_err(|e| db_err(format!("Failed to get INTEGER from '{column}': {e}")))?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row
                .try_get(column)
                .map_err(|e| db_err(format!("Failed to get REAL from '{column}': {e}")))?;
            Decimal::try_from(val)
                .map_err(|e| db_err(format!("Failed to convert {val} to Decimal: {e}")))
        }
        "NULL" => Ok(Decimal::ZERO),
        other => Err(db_err(format!(
            "Unexpected type '{other}' for column '{column}'"
        ))),
    }
}

pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE prices (
                id INTEGER PRIMARY KEY,
                whole INTEGER,
                amount REAL,
                missing REAL,
                label TEXT
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn row_with(values: &str) -> SqliteRow {
        let pool = setup_test_db().await;
        sqlx::query(&format!("INSERT INTO prices {values}"))
            .execute(&pool)
            .await
            .expect("Failed to insert test data");
        sqlx::query("SELECT * FROM prices WHERE id = 1")
            .fetch_one(&pool)
            .await
            .expect("Failed to fetch row")
    }

    #[tokio::test]
    async fn integer_price_reads_as_decimal() {
        let row = row_with("(id, whole) VALUES (1, 27440)").await;

        assert_eq!(get_decimal(&row, "whole"), Ok(dec!(27440)));
    }

    #[tokio::test]
    async fn real_price_reads_as_decimal() {
        let row = row_with("(id, amount) VALUES (1, 22491.8)").await;

        assert_eq!(get_decimal(&row, "amount"), Ok(dec!(22491.8)));
    }

    #[tokio::test]
    async fn null_reads_as_zero() {
        let row = row_with("(id, missing) VALUES (1, NULL)").await;

        assert_eq!(get_decimal(&row, "missing"), Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn unknown_column_is_database_error() {
        let row = row_with("(id) VALUES (1)").await;

        let result = get_decimal(&row, "nonexistent");

        assert!(matches!(result, Err(BackendError::Database(msg)) if msg.starts_with("Column 'nonexistent' not found:")));
    }

    #[tokio::test]
    async fn text_column_rejected() {
        let row = row_with("(id, label) VALUES (1, 'cheap')").await;

        assert_eq!(
            get_decimal(&row, "label"),
            Err(BackendError::Database(
                "Unexpected type 'TEXT' for column 'label'".to_string()
            ))
        );
    }

    #[test]
    fn decimal_to_f64_keeps_cents() {
        assert_eq!(decimal_to_f64(dec!(1111.00)), 1111.0);
        assert_eq!(decimal_to_f64(dec!(0.28)), 0.28);
        assert_eq!(decimal_to_f64(Decimal::ZERO), 0.0);
    }
}
