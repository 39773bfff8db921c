//! Checkout sequencing.
//!
//! Checkout decrements stock across several independently-updated product
//! rows, then clears the cart. The decrements are issued sequentially with
//! per-line success tracking; there is no multi-row transaction and no
//! compensating rollback, so a mid-sequence failure leaves earlier decrements
//! applied and the cart intact (reported as
//! [`CartError::PartialCheckout`]). See DESIGN.md for why this weak
//! consistency is preserved rather than fixed.

use rust_decimal::Decimal;
use tracing::{error, instrument};

use crate::error::{CartError, ProductRef};
use crate::manager::CartStateManager;
use crate::models::{CartLine, subtotal};
use crate::repository::{CartRepository, ProductCatalog};
use crate::stock::within_stock;

/// The finalized item list and total handed to the downstream order surface
/// at the moment checkout succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

/// Result of a checkout run that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The cart was empty; benign, nothing happened.
    EmptyCart,
    /// Every decrement succeeded and the cart was cleared.
    Completed(OrderSummary),
}

/// Sequences stock decrements across all cart lines, then clears the cart.
pub struct CheckoutCoordinator<'a, R, P> {
    cart: &'a CartStateManager<R, P>,
}

impl<'a, R, P> CheckoutCoordinator<'a, R, P>
where
    R: CartRepository,
    P: ProductCatalog,
{
    #[must_use]
    pub const fn new(cart: &'a CartStateManager<R, P>) -> Self {
        Self { cart }
    }

    /// Run the checkout sequence.
    ///
    /// 1. Empty cart short-circuits to [`CheckoutOutcome::EmptyCart`].
    /// 2. Every line is validated against *current* stock (stock may have
    ///    drifted since the snapshot was taken); any shortfall aborts with
    ///    the cart untouched.
    /// 3. Stock is decremented line by line, `new_stock = max(0, stock -
    ///    quantity)`, success tracked per line.
    /// 4. All succeeded: the cart is cleared and the order summary returned.
    /// 5. Any failed: `PartialCheckout` naming only the failed products;
    ///    applied decrements stay applied and the cart is not cleared.
    ///
    /// The manager's operation lock is held for the whole sequence, so cart
    /// mutators cannot interleave with a checkout on the same instance.
    ///
    /// # Errors
    ///
    /// - `CartError::InsufficientStock` when validation finds drifted lines
    /// - `CartError::PartialCheckout` when some decrements fail
    /// - `CartError::Persistence`/`CartError::Session` when validation reads
    ///   or the final cart clear fail
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutOutcome, CartError> {
        let mut inner = self.cart.inner.lock().await;

        if inner.lines.is_empty() {
            return Ok(CheckoutOutcome::EmptyCart);
        }

        // Validate against current stock. A product that has vanished since
        // it was added counts as insufficient; it cannot be decremented.
        let mut current = Vec::with_capacity(inner.lines.len());
        let mut insufficient = Vec::new();
        for line in &inner.lines {
            match self.cart.catalog.get(line.product_id).await? {
                Some(product) if within_stock(line.quantity, product.stock) => {
                    current.push((line.clone(), product));
                }
                Some(product) => {
                    insufficient.push(ProductRef::new(product.id, product.name));
                }
                None => {
                    insufficient.push(ProductRef::new(line.product_id, line.product.name.clone()));
                }
            }
        }
        if !insufficient.is_empty() {
            return Err(CartError::InsufficientStock(insufficient));
        }

        // Sequential decrements; the same client cannot double-decrement, but
        // nothing guards against a concurrent client racing the same row.
        let mut failed = Vec::new();
        for (line, product) in &current {
            let new_stock = product.stock.saturating_sub(line.quantity);
            if let Err(e) = self
                .cart
                .catalog
                .update_stock(line.product_id, new_stock)
                .await
            {
                error!(product_id = %line.product_id, "stock decrement failed: {e}");
                failed.push(ProductRef::new(line.product_id, line.product.name.clone()));
            }
        }
        if !failed.is_empty() {
            return Err(CartError::PartialCheckout(failed));
        }

        let items = inner.lines.clone();
        let total = subtotal(&items);

        let snapshot = std::mem::take(&mut inner.lines);
        self.cart.publish(&inner.lines);
        if let Err(e) = self.cart.persist_clear(inner.auth).await {
            inner.lines = snapshot;
            self.cart.publish(&inner.lines);
            return Err(e);
        }

        Ok(CheckoutOutcome::Completed(OrderSummary { items, total }))
    }
}
