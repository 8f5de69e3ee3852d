//! `PostgreSQL` record store.
//!
//! # Tables
//!
//! - `portal.records` - one JSONB value per `(collection, key)`
//! - `portal.seed_markers` - collections that have been through bootstrap
//!
//! A row trigger on `portal.records` publishes the collection name on the
//! `portal_records` channel. Each subscription holds a `PgListener` and
//! reloads the whole collection when its name arrives.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/portal/migrations/` and run via:
//! ```bash
//! cargo run -p lifestream-cli -- migrate
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::{PgListener, PgPoolOptions};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use lifestream_core::Collection;

use super::{RecordStore, SeedOutcome, StoreError, Subscription, new_key};

/// `NOTIFY` channel written by the `portal.records` trigger.
pub const CHANGE_CHANNEL: &str = "portal_records";

/// Pause before reloading after the listener connection drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the portal's embedded migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// [`RecordStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a store using an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn load_snapshot(
    pool: &PgPool,
    collection: Collection,
) -> Result<BTreeMap<String, Value>, sqlx::Error> {
    let rows: Vec<(String, Value)> =
        sqlx::query_as("SELECT key, value FROM portal.records WHERE collection = $1")
            .bind(collection.as_str())
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

/// Reload `collection` whenever its name is notified, until every receiver
/// is gone.
async fn run_feed(
    pool: PgPool,
    mut listener: PgListener,
    collection: Collection,
    tx: watch::Sender<super::RawSnapshot>,
) {
    loop {
        let reload = match listener.recv().await {
            Ok(notification) => notification.payload() == collection.as_str(),
            Err(e) => {
                // The listener reconnects on the next recv; changes made in
                // between were not notified, so reload unconditionally.
                warn!(collection = %collection, error = %e, "Change feed interrupted");
                tokio::time::sleep(RECONNECT_DELAY).await;
                true
            }
        };

        if !reload {
            continue;
        }

        match load_snapshot(&pool, collection).await {
            Ok(snapshot) => {
                debug!(collection = %collection, records = snapshot.len(), "Snapshot reloaded");
                if tx.send(Arc::new(snapshot)).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "Failed to reload snapshot");
            }
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self))]
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        // Load after LISTEN so no change falls between the two.
        let initial = load_snapshot(&self.pool, collection).await?;
        let (tx, rx) = watch::channel(Arc::new(initial));
        let feed = tokio::spawn(run_feed(self.pool.clone(), listener, collection, tx));

        Ok(Subscription::new(collection, rx, Some(feed)))
    }

    #[instrument(skip(self, record))]
    async fn create(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
        let key = new_key();
        sqlx::query("INSERT INTO portal.records (collection, key, value) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(&key)
            .bind(&record)
            .execute(&self.pool)
            .await?;
        Ok(key)
    }

    #[instrument(skip(self, record))]
    async fn put(
        &self,
        collection: Collection,
        key: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO portal.records (collection, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            ",
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(&record)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT value FROM portal.records WHERE collection = $1 AND key = $2")
                .bind(collection.as_str())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    #[instrument(skip(self, partial))]
    async fn update(
        &self,
        collection: Collection,
        key: &str,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        // jsonb `||` replaces top-level keys only.
        let result = sqlx::query(
            r"
            UPDATE portal.records
            SET value = value || $3, updated_at = now()
            WHERE collection = $1 AND key = $2
            ",
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(Value::Object(partial))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                key: key.to_owned(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM portal.records WHERE collection = $1 AND key = $2")
            .bind(collection.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, seeds), fields(seeds = seeds.len()))]
    async fn ensure_seeded(
        &self,
        collection: Collection,
        seeds: Vec<Value>,
    ) -> Result<SeedOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Concurrent bootstraps block here until the first one commits.
        let marked = sqlx::query(
            "INSERT INTO portal.seed_markers (collection) VALUES ($1) ON CONFLICT DO NOTHING",
        )
        .bind(collection.as_str())
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let (existing,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM portal.records WHERE collection = $1")
                .bind(collection.as_str())
                .fetch_one(&mut *tx)
                .await?;

        if existing > 0 {
            tx.commit().await?;
            return Ok(SeedOutcome::NotEmpty);
        }

        let count = seeds.len();
        for seed in seeds {
            sqlx::query("INSERT INTO portal.records (collection, key, value) VALUES ($1, $2, $3)")
                .bind(collection.as_str())
                .bind(new_key())
                .bind(&seed)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(SeedOutcome::Seeded(count))
    }
}
