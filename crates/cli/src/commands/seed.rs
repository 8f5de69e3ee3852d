//! Demo data bootstrap.
//!
//! Writes the demo donors, requests, and banks into each collection that
//! has never been seeded and is still empty. Running it again is a no-op.

use lifestream_portal::config::get_database_url;
use lifestream_portal::store::{PgRecordStore, SeedOutcome, postgres, seed};
use tracing::info;

/// Seed the demo data set.
///
/// # Errors
///
/// Returns an error if no database URL is set or a store write fails.
pub async fn demo_data() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url =
        get_database_url("PORTAL_DATABASE_URL").ok_or("PORTAL_DATABASE_URL not set")?;
    let pool = postgres::create_pool(&database_url).await?;
    let store = PgRecordStore::new(pool);

    for (collection, outcome) in seed::seed_demo_data(&store).await? {
        match outcome {
            SeedOutcome::Seeded(count) => info!(%collection, count, "Seeded"),
            SeedOutcome::AlreadySeeded => info!(%collection, "Already seeded, skipped"),
            SeedOutcome::NotEmpty => info!(%collection, "Has records, skipped"),
        }
    }
    Ok(())
}
