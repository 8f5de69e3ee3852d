//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! lifestream migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PORTAL_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/portal/migrations/`:
//! - `..._create_records.sql` - `portal.records`, seed markers, change trigger
//! - `..._create_credentials.sql` - password accounts

use lifestream_portal::config::get_database_url;
use lifestream_portal::store::postgres;
use tracing::info;

/// Apply the portal migrations.
///
/// # Errors
///
/// Returns an error if no database URL is set, the connection fails, or a
/// migration fails.
pub async fn portal() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url =
        get_database_url("PORTAL_DATABASE_URL").ok_or("PORTAL_DATABASE_URL not set")?;

    info!("Connecting to portal database...");
    let pool = postgres::create_pool(&database_url).await?;

    info!("Running portal migrations...");
    postgres::migrate(&pool).await?;

    info!("Portal migrations complete!");
    Ok(())
}
