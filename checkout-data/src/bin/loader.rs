use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use checkout_core::InventoryStore;
use checkout_data::CarInventoryLoader;
use checkout_db_sqlite::SqliteBackend;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Load car inventory from a CSV file into the marketplace database.
///
/// The CSV file should have the following columns:
/// - id, brand, model: identify the car
/// - price, mileage: decimals
/// - year, power: integers (power may be empty)
/// - fuel, gear, country: free text, may be empty
/// - images, features: `|`-separated lists, may be empty
#[derive(Parser, Debug)]
#[command(name = "checkout-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing the cars
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database file (created if missing)
    #[arg(short, long, default_value = "marketplace.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Only used to build inspection URLs, which the loader never creates.
    let backend = SqliteBackend::new(&args.database, "")
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        backend
            .run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        backend
            .run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading cars from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = CarInventoryLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let loaded = CarInventoryLoader::load(&backend, &records)
        .await
        .context("Failed to load cars into database")?;
    let total = backend
        .count_cars()
        .await
        .context("Failed to count cars")?;

    println!("Successfully loaded {loaded} cars ({total} in the database).");

    Ok(())
}
