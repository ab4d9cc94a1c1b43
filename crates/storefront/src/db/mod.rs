//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `frame`, `mat`, `glass`, `reveal_size` - Option catalog
//! - `customer` - Contact details, unique by email
//! - `framing_order` - Orders with their current status
//! - `line_item` - Frozen design snapshots (JSONB)
//! - `order_stage_history` - Append-only status log
//! - `appointment` - In-store bookings
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p frameshop-cli -- migrate
//! ```

pub mod appointments;
pub mod catalog;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use frameshop_core::CustomerId;
use frameshop_core::order::Customer;

pub use appointments::AppointmentRepository;
pub use catalog::CatalogRepository;
pub use orders::{OrderFilter, OrderRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be mapped to a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Entity not found.
    #[error("not found")]
    NotFound,

    /// Write conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Requested status change is not allowed from the current status.
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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

/// Run embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Insert or refresh a customer by email, returning its ID.
pub(crate) async fn upsert_customer(
    tx: &mut Transaction<'_, Postgres>,
    customer: &Customer,
) -> Result<CustomerId, RepositoryError> {
    let id: CustomerId = sqlx::query_scalar(
        r"
        INSERT INTO storefront.customer (email, name, phone)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                phone = COALESCE(EXCLUDED.phone, storefront.customer.phone),
                updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(customer.email.as_str())
    .bind(&customer.name)
    .bind(customer.phone.as_deref())
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}
