//! Anonymous cart storage in the session.
//!
//! The anonymous cart is a JSON array of [`CartLine`] under the `cart-items`
//! key of a `tower_sessions::Session`. It survives reloads for the lifetime
//! of the session but is not shared across tabs; concurrent tabs are
//! last-writer-wins.

use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use greengrocer_core::CartLineId;

use crate::models::CartLine;

/// Session key holding the anonymous cart snapshot.
pub const CART_ITEMS_KEY: &str = "cart-items";

/// Cart snapshot storage over a session.
#[derive(Debug, Clone)]
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Load the stored cart, empty if none has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns the session error if the store is unreachable or the stored
    /// value fails to deserialize.
    pub async fn load(&self) -> Result<Vec<CartLine>, SessionError> {
        Ok(self
            .session
            .get::<Vec<CartLine>>(CART_ITEMS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Replace the stored cart wholesale.
    ///
    /// # Errors
    ///
    /// Returns the session error if the write fails.
    pub async fn save(&self, lines: &[CartLine]) -> Result<(), SessionError> {
        self.session.insert(CART_ITEMS_KEY, lines).await
    }

    /// Insert or update a single line, keyed by `product_id`.
    ///
    /// # Errors
    ///
    /// Returns the session error if the read or write fails.
    pub async fn upsert(&self, line: &CartLine) -> Result<(), SessionError> {
        let mut lines = self.load().await?;
        if let Some(existing) = lines.iter_mut().find(|l| l.product_id == line.product_id) {
            *existing = line.clone();
        } else {
            lines.push(line.clone());
        }
        self.save(&lines).await
    }

    /// Delete a single line. Deleting an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns the session error if the read or write fails.
    pub async fn delete(&self, line_id: CartLineId) -> Result<(), SessionError> {
        let mut lines = self.load().await?;
        lines.retain(|l| l.id != line_id);
        self.save(&lines).await
    }

    /// Remove the stored cart entirely.
    ///
    /// # Errors
    ///
    /// Returns the session error if the removal fails.
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.session
            .remove::<Vec<CartLine>>(CART_ITEMS_KEY)
            .await
            .map(|_| ())
    }
}
