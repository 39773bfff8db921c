//! Cart data model.
//!
//! A cart is a list of [`CartLine`]s, each carrying a point-in-time
//! [`ProductSnapshot`] of the product row it refers to. Snapshots are only
//! constructed through [`ProductSnapshot::new`], so malformed rows are
//! rejected at the repository boundary instead of propagating missing or
//! nonsensical fields into the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use greengrocer_core::{CartLineId, Price, ProductId};

/// A point-in-time copy of a product row. Not owned by the cart; refreshed
/// from the catalog on every remote read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Units available at the time the snapshot was taken.
    pub stock: u32,
    pub images: Vec<String>,
}

/// A malformed product row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("product {0} has an empty name")]
    EmptyName(ProductId),
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),
}

impl ProductSnapshot {
    /// Validate and construct a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the name is empty or the price is negative.
    pub fn new(
        id: ProductId,
        name: String,
        price: Price,
        stock: u32,
        images: Vec<String>,
    ) -> Result<Self, SnapshotError> {
        if name.trim().is_empty() {
            return Err(SnapshotError::EmptyName(id));
        }
        if price.amount.is_sign_negative() {
            return Err(SnapshotError::NegativePrice(id));
        }
        Ok(Self {
            id,
            name,
            price,
            stock,
            images,
        })
    }
}

/// One cart entry for a distinct product with a quantity.
///
/// Invariants (hold after every successful mutation):
/// - `quantity >= 1` — removal is the representation of zero
/// - `quantity <= product.stock`
/// - at most one line per `product_id` within a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartLine {
    /// Create a fresh line for `product` with a generated ID.
    #[must_use]
    pub fn new(product: ProductSnapshot, quantity: u32) -> Self {
        Self {
            id: CartLineId::generate(),
            product_id: product.id,
            quantity,
            product,
        }
    }

    /// Price of this line (`quantity * unit price`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.extended(self.quantity)
    }
}

/// Total amount for a set of cart lines.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}
