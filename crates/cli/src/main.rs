//! LifeStream CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply portal migrations
//! lifestream migrate
//!
//! # Bootstrap demo donors, requests, and banks (idempotent)
//! lifestream seed
//!
//! # Check donor eligibility
//! lifestream eligibility --age 30 --last-donation 2026-01-15
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed demo data once per collection
//! - `eligibility` - Evaluate the age and donation-interval rules

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lifestream")]
#[command(author, version, about = "LifeStream CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed demo data into empty collections
    Seed,
    /// Check whether a donor may donate
    Eligibility {
        /// Donor age in years
        #[arg(short, long)]
        age: u32,

        /// Last donation date (YYYY-MM-DD)
        #[arg(short, long)]
        last_donation: NaiveDate,

        /// Evaluate as of this date instead of today
        #[arg(long)]
        on: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::portal().await?,
        Commands::Seed => commands::seed::demo_data().await?,
        Commands::Eligibility {
            age,
            last_donation,
            on,
        } => {
            let eligible = commands::eligibility::check(age, last_donation, on);
            if !eligible {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}
