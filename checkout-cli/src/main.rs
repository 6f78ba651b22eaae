use std::path::PathBuf;

use anyhow::Context;
use checkout_core::{FinancingPreset, FinancingProduct, FinancingTable, MarketplaceBackend};
use checkout_cli::app::{self, QuoteRequest};
use checkout_cli::config::AppConfig;
use checkout_cli::logging;
use checkout_cli::script::WalkthroughScript;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::debug;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Car checkout: financing quotes, order charges and wizard walkthroughs.
#[derive(Debug, Parser)]
#[command(name = "checkout", version)]
struct Cli {
    /// Settings file; missing means defaults.
    #[arg(long, default_value = "checkout.toml")]
    config: PathBuf,

    /// Log level or EnvFilter directive; overrides `[logging] level`.
    #[arg(long)]
    log_level: Option<String>,

    /// Backend to use; overrides `[backend] backend`.
    #[arg(long)]
    backend: Option<String>,

    /// Connection string; overrides `[backend] connection_string`.
    /// For SQLite this is a file path (e.g. `marketplace.db`) or `:memory:`.
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a financing quote.
    Quote {
        #[arg(long)]
        price: Decimal,

        #[arg(long, value_enum, default_value_t = ProductArg::RegularLoan)]
        product: ProductArg,

        #[arg(long)]
        months: u32,

        /// Down payment in percent of the price.
        #[arg(long)]
        down_payment: u32,

        /// Use a built-in product table instead of the configured one.
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
    },

    /// Print the charge breakdown for a car.
    Charges {
        #[arg(long)]
        car: String,

        #[arg(long)]
        zipcode: Option<String>,
    },

    /// Replay a TOML script of wizard events and print step statuses.
    Walkthrough {
        #[arg(long)]
        script: PathBuf,

        /// Overrides the script's `car`.
        #[arg(long)]
        car: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProductArg {
    LowInstallment,
    RegularLoan,
}

impl From<ProductArg> for FinancingProduct {
    fn from(arg: ProductArg) -> Self {
        match arg {
            ProductArg::LowInstallment => FinancingProduct::LowInstallment,
            ProductArg::RegularLoan => FinancingProduct::RegularLoan,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Checkout,
    Calculator,
}

impl From<PresetArg> for FinancingPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Checkout => FinancingPreset::Checkout,
            PresetArg::Calculator => FinancingPreset::Calculator,
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("cannot load config '{}'", cli.config.display()))?;
    if let Some(backend) = cli.backend {
        config.backend.backend = backend;
    }
    if let Some(db) = cli.db {
        config.backend.connection_string = db;
    }

    logging::init_logging(&config.logging, cli.log_level.as_deref())?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Quote {
            price,
            product,
            months,
            down_payment,
            preset,
        } => {
            let table = match preset {
                Some(preset) => FinancingTable::preset(preset.into()),
                None => config.financing_table()?,
            };
            let request = QuoteRequest {
                price,
                product: product.into(),
                months,
                down_payment_percent: down_payment,
            };
            let quote = app::quote(table, &request)?;
            println!("{quote}");
        }
        Command::Charges { car, zipcode } => {
            let backend = app::open_backend(&config).await?;
            let charges = backend
                .get_charges(&car, zipcode.as_deref())
                .await
                .with_context(|| format!("cannot load charges for '{car}'"))?;
            println!("{charges}");
        }
        Command::Walkthrough { script, car } => {
            let script = WalkthroughScript::load(&script)?;
            let mut session = app::open_session(&config).await?;
            let reports = app::run_walkthrough(&mut session, &script, car.as_deref()).await?;

            if let Some(car) = session.car() {
                println!("{}  price {}", car.title(), car.price);
            }
            for (i, report) in reports.iter().enumerate() {
                println!("[{}] {report}", i + 1);
            }
            if session.wizard().is_complete() {
                println!("checkout complete");
            }
        }
    }

    Ok(())
}
