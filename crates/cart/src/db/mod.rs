//! Postgres persistence for the cart engine.
//!
//! ## Tables
//!
//! - `cart_line` - Persisted per-user cart rows, unique on
//!   `(user_id, product_id)`
//! - `product` - Catalog rows `(id, name, price, currency, stock, images)`;
//!   owned by the catalog subsystem, read and stock-updated here
//!
//! # Migrations
//!
//! Migrations are stored in `crates/cart/migrations/` and run with
//! `sqlx migrate run`.

mod cart_lines;
mod products;

pub use cart_lines::PgCartRepository;
pub use products::PgProductCatalog;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::CartConfig;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row violated an invariant the application relies on.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,
}

/// Create a Postgres connection pool from configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &CartConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(config.database_url.expose_secret())
        .await
}
