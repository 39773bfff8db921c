//! Cart error taxonomy.
//!
//! Every mutator returns `Result<_, CartError>`. Nothing here is fatal to the
//! process; callers (typically a UI layer) decide how each failure is
//! presented. Stock-limit *clamps* are not errors — they travel as warnings
//! inside [`crate::manager::MutationOutcome`].

use thiserror::Error;

use greengrocer_core::{CartLineId, ProductId};

use crate::db::RepositoryError;

/// A product named in an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
}

impl ProductRef {
    #[must_use]
    pub const fn new(id: ProductId, name: String) -> Self {
        Self { id, name }
    }
}

/// Comma-joined product names for error display.
fn product_list(products: &[ProductRef]) -> String {
    products
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors surfaced by cart mutations and checkout.
#[derive(Debug, Error)]
pub enum CartError {
    /// A mutation asked for a quantity of zero where a line would be created.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// A fresh add requested more than the product has in stock.
    #[error("only {available} of \"{name}\" in stock (requested {requested})")]
    StockExceeded {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// Checkout pre-flight found lines whose quantity exceeds current stock.
    #[error("insufficient stock for: {}", product_list(.0))]
    InsufficientStock(Vec<ProductRef>),

    /// The referenced product does not exist in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The referenced cart line does not exist.
    #[error("cart line not found: {0}")]
    LineNotFound(CartLineId),

    /// A remote backend write or read failed; any optimistic in-memory change
    /// has been reverted before this is surfaced.
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    /// A session-store write or read failed; reverted like [`Self::Persistence`].
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// One or more stock decrements failed mid-checkout. Decrements already
    /// applied to other lines are not rolled back and the cart is not
    /// cleared.
    #[error("stock update failed for: {}", product_list(.0))]
    PartialCheckout(Vec<ProductRef>),
}
