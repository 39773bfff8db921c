//! Persistence traits for the cart engine.
//!
//! `CartStateManager` is generic over these traits so the engine can run
//! against Postgres in production and in-memory fakes in tests. The session
//! backend is concrete ([`crate::session::SessionCartStore`]) — it is local
//! by nature and needs no substitution seam.

use greengrocer_core::{CartLineId, ProductId, UserId};

use crate::db::RepositoryError;
use crate::models::{CartLine, ProductSnapshot};

/// Remote cart persistence, keyed by `(user, product)`.
///
/// Reads return lines joined with a fresh product snapshot. Implementations
/// must enforce the unique-`(user, product)` constraint: an upsert racing a
/// concurrent identical insert resolves to a single merged line, never a
/// duplicate.
#[allow(async_fn_in_trait)]
pub trait CartRepository {
    /// Load all lines for a user, snapshots refreshed from the product table.
    async fn load(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Replace the user's cart wholesale.
    async fn save(&self, user: UserId, lines: &[CartLine]) -> Result<(), RepositoryError>;

    /// Insert or update a single line.
    async fn upsert_line(&self, user: UserId, line: &CartLine) -> Result<(), RepositoryError>;

    /// Delete a single line. Deleting a line that does not exist is not an
    /// error.
    async fn delete_line(&self, user: UserId, line_id: CartLineId)
    -> Result<(), RepositoryError>;

    /// Delete all lines for a user.
    async fn clear(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Read and partial-update access to the product table.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog {
    /// Fetch the current product row, or `None` if it does not exist.
    async fn get(&self, product_id: ProductId)
    -> Result<Option<ProductSnapshot>, RepositoryError>;

    /// Partial update of the product's stock count.
    ///
    /// Failure of this call is the sole trigger for a partial checkout
    /// failure. There is no compare-and-swap token; a concurrent client can
    /// decrement the same row between our read and this write (preserved
    /// oversell race, see DESIGN.md).
    async fn update_stock(&self, product_id: ProductId, new_stock: u32)
    -> Result<(), RepositoryError>;
}
