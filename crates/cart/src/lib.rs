//! Greengrocer cart consistency and checkout engine.
//!
//! One logical cart, two storage backends: an ephemeral per-browser session
//! store while the shopper is anonymous, persisted per-user rows once they
//! authenticate. Exactly one backend is authoritative at any moment, selected
//! by authentication state; [`CartStateManager`] owns the in-memory copy
//! shown to the UI and keeps it synchronized with the authoritative backend
//! through optimistic mutation with rollback.
//!
//! # Example
//!
//! ```rust,ignore
//! use greengrocer_cart::{
//!     AuthState, CartStateManager, CheckoutCoordinator, SessionCartStore,
//!     config::CartConfig,
//!     db::{PgCartRepository, PgProductCatalog, create_pool},
//! };
//!
//! let config = CartConfig::from_env()?;
//! let pool = create_pool(&config).await?;
//!
//! let cart = CartStateManager::new(
//!     SessionCartStore::new(session),
//!     PgCartRepository::new(pool.clone()),
//!     PgProductCatalog::new(pool),
//!     AuthState::Anonymous,
//! );
//! cart.load().await?;
//!
//! cart.add_to_cart(product_id, 2).await?;
//! let outcome = CheckoutCoordinator::new(&cart).checkout().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod manager;
pub mod models;
pub mod repository;
pub mod session;
pub mod stock;

pub use auth::{AuthEvent, AuthState};
pub use checkout::{CheckoutCoordinator, CheckoutOutcome, OrderSummary};
pub use error::{CartError, ProductRef};
pub use manager::{CartStateManager, MutationOutcome, StockWarning};
pub use models::{CartLine, ProductSnapshot};
pub use repository::{CartRepository, ProductCatalog};
pub use session::SessionCartStore;
