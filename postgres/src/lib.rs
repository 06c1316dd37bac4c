//! `PostgreSQL` relational store for the youth group backend.
//!
//! [`PostgresStore`] implements every relational gateway trait from
//! `youthgroup-core` over a shared `sqlx` connection pool:
//!
//! - People and role records ([`PeopleRepository`](youthgroup_core::stores::PeopleRepository))
//! - Events, registrations and attendance ([`EventRepository`](youthgroup_core::stores::EventRepository))
//! - Small groups ([`SmallGroupRepository`](youthgroup_core::stores::SmallGroupRepository))
//!
//! Write operations run in a transaction that is committed only after every
//! statement succeeds; an early return drops the transaction, which rolls it
//! back and returns the connection to the pool.
//!
//! # Example
//!
//! ```ignore
//! use youthgroup_postgres::{PoolSettings, PostgresStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect(&PoolSettings::new("postgres://localhost/youthgroup")).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod capabilities;
mod events;
mod groups;
mod ids;
mod people;

pub use capabilities::detect_capabilities;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use youthgroup_core::model::SchemaCapabilities;
use youthgroup_core::stores::{RelationalStore, StoreFuture};
use youthgroup_core::{Result, YouthGroupError};

/// Connection pool settings.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    /// Connection URL.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Connections kept open when idle.
    pub min_connections: u32,
    /// How long to wait for a free connection.
    pub acquire_timeout: Duration,
    /// Apply bundled migrations after connecting.
    pub run_migrations: bool,
}

impl PoolSettings {
    /// Settings with the defaults used by the server.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: false,
        }
    }
}

/// Relational store over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    capabilities: SchemaCapabilities,
}

impl PostgresStore {
    /// Connects, optionally migrates, and detects schema capabilities.
    ///
    /// # Errors
    ///
    /// Returns a relational store error if the connection, migration or
    /// capability probe fails.
    pub async fn connect(settings: &PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await
            .map_err(|e| YouthGroupError::relational(format!("Failed to connect: {e}")))?;

        if settings.run_migrations {
            migrate(&pool).await?;
        }

        let store = Self::from_pool(pool).await?;
        tracing::info!(
            max_connections = settings.max_connections,
            volunteer_registrations = store.capabilities.registration_volunteer,
            "Connected to PostgreSQL"
        );
        Ok(store)
    }

    /// Wraps an existing pool, probing schema capabilities once.
    ///
    /// # Errors
    ///
    /// Returns a relational store error if the capability probe fails.
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let capabilities = detect_capabilities(&pool).await?;
        Ok(Self { pool, capabilities })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every pooled connection. Used at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| YouthGroupError::relational(format!("Failed to start transaction: {e}")))
    }
}

/// Applies the bundled schema migrations.
///
/// # Errors
///
/// Returns a relational store error if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| YouthGroupError::relational(format!("Migration failed: {e}")))?;
    Ok(())
}

impl RelationalStore for PostgresStore {
    fn capabilities(&self) -> SchemaCapabilities {
        self.capabilities
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| YouthGroupError::relational(format!("PostgreSQL ping failed: {e}")))?;
            Ok(())
        })
    }
}

/// Maps a driver error, turning constraint violations into validation
/// failures.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> YouthGroupError {
    move |error| {
        if let sqlx::Error::Database(db) = &error {
            match db.code().as_deref() {
                // foreign_key_violation
                Some("23503") => {
                    return YouthGroupError::validation(format!(
                        "{context}: violates a reference between records"
                    ));
                }
                // unique_violation
                Some("23505") => {
                    return YouthGroupError::validation(format!("{context}: duplicate record"));
                }
                _ => {}
            }
        }
        YouthGroupError::relational(format!("{context}: {error}"))
    }
}

/// Counts a committed write.
pub(crate) fn record_write(table: &'static str) {
    metrics::counter!("youthgroup_relational_writes_total", "table" => table).increment(1);
}

/// Commits, mapping the driver error.
pub(crate) async fn commit(tx: Transaction<'static, Postgres>) -> Result<()> {
    tx.commit().await.map_err(db_error("Failed to commit transaction"))
}
