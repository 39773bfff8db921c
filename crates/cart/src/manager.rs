//! The in-memory cart store.
//!
//! `CartStateManager` owns the cart lines shown to the UI and keeps them
//! synchronized with whichever backend is authoritative: the session store
//! while anonymous, the remote repository once authenticated.
//!
//! Every mutator follows the same optimistic pattern: mutate the in-memory
//! state and publish it to subscribers first, then persist, and on a
//! persistence failure restore the pre-mutation snapshot before surfacing the
//! error. A per-instance `tokio::sync::Mutex` is held across each operation
//! (awaits included), so mutators issued concurrently against one instance
//! serialize instead of interleaving.

use tokio::sync::{Mutex, watch};
use tracing::{instrument, warn};

use greengrocer_core::{CartLineId, ProductId};
use rust_decimal::Decimal;

use crate::auth::{self, AuthEvent, AuthState};
use crate::error::CartError;
use crate::models::{CartLine, subtotal};
use crate::repository::{CartRepository, ProductCatalog};
use crate::session::SessionCartStore;
use crate::stock::{StockDecision, clamp_to_stock, within_stock};

/// A quantity request that was capped to available stock.
///
/// Not an error: the mutation succeeded with the granted quantity. The UI
/// decides how (and whether) to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWarning {
    pub product_id: ProductId,
    pub name: String,
    /// What the caller asked for (for merges, the combined quantity).
    pub requested: u32,
    /// What the line holds now.
    pub capped_to: u32,
}

/// Result of a successful cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// The cart as it stands after the mutation.
    pub lines: Vec<CartLine>,
    /// Present when the requested quantity was clamped to stock.
    pub warning: Option<StockWarning>,
}

pub(crate) struct CartState {
    pub(crate) lines: Vec<CartLine>,
    pub(crate) auth: AuthState,
}

/// Reactive cart store orchestrating optimistic mutation, persistence, and
/// rollback.
pub struct CartStateManager<R, P> {
    session: SessionCartStore,
    remote: R,
    pub(crate) catalog: P,
    pub(crate) inner: Mutex<CartState>,
    changes: watch::Sender<Vec<CartLine>>,
}

impl<R, P> CartStateManager<R, P>
where
    R: CartRepository,
    P: ProductCatalog,
{
    /// Create a manager with an empty cart.
    ///
    /// `initial_auth` comes from probing the auth provider at process start;
    /// call [`Self::load`] afterwards to hydrate from the authoritative
    /// backend.
    #[must_use]
    pub fn new(
        session: SessionCartStore,
        remote: R,
        catalog: P,
        initial_auth: AuthState,
    ) -> Self {
        let (changes, _) = watch::channel(Vec::new());
        Self {
            session,
            remote,
            catalog,
            inner: Mutex::new(CartState {
                lines: Vec::new(),
                auth: initial_auth,
            }),
            changes,
        }
    }

    /// Subscribe to cart snapshots. The receiver sees every committed state,
    /// including optimistic intermediates and their reverts.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.changes.subscribe()
    }

    /// Hydrate the in-memory cart from the authoritative backend.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence`/`CartError::Session` if the backend
    /// read fails; in-memory state is left unchanged.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<CartLine>, CartError> {
        let mut inner = self.inner.lock().await;
        let loaded = match inner.auth {
            AuthState::Anonymous => self.session.load().await?,
            AuthState::Authenticated(user) => self.remote.load(user).await?,
        };
        inner.lines = loaded;
        self.publish(&inner.lines);
        Ok(inner.lines.clone())
    }

    /// Current cart lines.
    pub async fn lines(&self) -> Vec<CartLine> {
        self.inner.lock().await.lines.clone()
    }

    /// Total number of units across all lines.
    pub async fn item_count(&self) -> u32 {
        self.inner
            .lock()
            .await
            .lines
            .iter()
            .map(|l| l.quantity)
            .sum()
    }

    /// Total amount across all lines.
    pub async fn subtotal(&self) -> Decimal {
        subtotal(&self.inner.lock().await.lines)
    }

    /// Current authentication state.
    pub async fn auth_state(&self) -> AuthState {
        self.inner.lock().await.auth
    }

    /// Add `quantity` units of a product.
    ///
    /// Merges into an existing line when one exists for the product, clamping
    /// the combined quantity to available stock (reported as a warning in the
    /// outcome). A fresh add beyond stock is rejected outright.
    ///
    /// # Errors
    ///
    /// - `CartError::InvalidQuantity` when `quantity` is zero
    /// - `CartError::ProductNotFound` when the product does not exist
    /// - `CartError::StockExceeded` when a fresh add over-asks
    /// - `CartError::Persistence`/`CartError::Session` when the backend write
    ///   fails (in-memory state reverted)
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<MutationOutcome, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut inner = self.inner.lock().await;

        let existing = inner
            .lines
            .iter()
            .find(|l| l.product_id == product_id)
            .cloned();

        if let Some(line) = existing {
            let combined = line.quantity.saturating_add(quantity);
            let decision = clamp_to_stock(combined, line.product.stock);
            let warning = warn_if_capped(decision, &line.product.name, product_id);

            let granted = decision.granted();
            if granted == line.quantity {
                // Already at the ceiling; nothing to persist.
                return Ok(MutationOutcome {
                    lines: inner.lines.clone(),
                    warning,
                });
            }

            let mut updated = line;
            updated.quantity = granted;
            self.apply_upsert(&mut inner, updated, warning).await
        } else {
            let product = self
                .catalog
                .get(product_id)
                .await?
                .ok_or(CartError::ProductNotFound(product_id))?;

            if !within_stock(quantity, product.stock) {
                return Err(CartError::StockExceeded {
                    product_id,
                    name: product.name,
                    requested: quantity,
                    available: product.stock,
                });
            }

            let line = CartLine::new(product, quantity);
            self.apply_upsert(&mut inner, line, None).await
        }
    }

    /// Set a line's quantity.
    ///
    /// A non-positive quantity removes the line. Requests over available
    /// stock are capped and reported as a warning rather than rejected,
    /// matching storefront behavior of clamping to what is available. Setting
    /// the current quantity is a no-op.
    ///
    /// # Errors
    ///
    /// - `CartError::LineNotFound` when the line does not exist
    /// - `CartError::Persistence`/`CartError::Session` when the backend write
    ///   fails (in-memory state reverted)
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        line_id: CartLineId,
        new_quantity: u32,
    ) -> Result<MutationOutcome, CartError> {
        if new_quantity == 0 {
            return self.remove_from_cart(line_id).await;
        }

        let mut inner = self.inner.lock().await;

        let line = inner
            .lines
            .iter()
            .find(|l| l.id == line_id)
            .cloned()
            .ok_or(CartError::LineNotFound(line_id))?;

        let decision = clamp_to_stock(new_quantity, line.product.stock);
        let warning = warn_if_capped(decision, &line.product.name, line.product_id);

        let granted = decision.granted();
        if granted == line.quantity {
            return Ok(MutationOutcome {
                lines: inner.lines.clone(),
                warning,
            });
        }

        let mut updated = line;
        updated.quantity = granted;
        self.apply_upsert(&mut inner, updated, warning).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// - `CartError::LineNotFound` when the line does not exist
    /// - `CartError::Persistence`/`CartError::Session` when the backend write
    ///   fails (the line is re-inserted at its original position)
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, line_id: CartLineId) -> Result<MutationOutcome, CartError> {
        let mut inner = self.inner.lock().await;

        if !inner.lines.iter().any(|l| l.id == line_id) {
            return Err(CartError::LineNotFound(line_id));
        }

        let snapshot = inner.lines.clone();
        inner.lines.retain(|l| l.id != line_id);
        self.publish(&inner.lines);

        if let Err(e) = self.persist_delete(inner.auth, line_id).await {
            inner.lines = snapshot;
            self.publish(&inner.lines);
            return Err(e);
        }

        Ok(MutationOutcome {
            lines: inner.lines.clone(),
            warning: None,
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence`/`CartError::Session` when the backend
    /// delete fails (in-memory state reverted).
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<MutationOutcome, CartError> {
        let mut inner = self.inner.lock().await;

        let snapshot = std::mem::take(&mut inner.lines);
        self.publish(&inner.lines);

        if let Err(e) = self.persist_clear(inner.auth).await {
            inner.lines = snapshot;
            self.publish(&inner.lines);
            return Err(e);
        }

        Ok(MutationOutcome {
            lines: Vec::new(),
            warning: None,
        })
    }

    /// React to a login/logout signal.
    ///
    /// Login discards the anonymous cart (memory and session) and loads the
    /// user's persisted cart, replacing rather than merging. Logout clears
    /// in-memory state to empty without resurrecting a prior session cart.
    /// Re-entering the current state is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the remote cart cannot be loaded
    /// on login; the transition is not applied in that case.
    #[instrument(skip(self))]
    pub async fn on_auth_event(&self, event: AuthEvent) -> Result<Vec<CartLine>, CartError> {
        let mut inner = self.inner.lock().await;

        let Some(next) = auth::transition(inner.auth, event) else {
            return Ok(inner.lines.clone());
        };

        match next {
            AuthState::Authenticated(user) => {
                let remote = self.remote.load(user).await?;
                if let Err(e) = self.session.clear().await {
                    // The remote cart is authoritative from here on; a stale
                    // session snapshot is never read back while authenticated.
                    warn!("failed to clear session cart on login: {e}");
                }
                inner.auth = next;
                inner.lines = remote;
            }
            AuthState::Anonymous => {
                inner.auth = next;
                inner.lines.clear();
            }
        }

        self.publish(&inner.lines);
        Ok(inner.lines.clone())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Optimistically apply an upsert of `line`, persist it, revert on failure.
    async fn apply_upsert(
        &self,
        inner: &mut CartState,
        line: CartLine,
        warning: Option<StockWarning>,
    ) -> Result<MutationOutcome, CartError> {
        let snapshot = inner.lines.clone();

        if let Some(existing) = inner.lines.iter_mut().find(|l| l.id == line.id) {
            *existing = line.clone();
        } else {
            inner.lines.push(line.clone());
        }
        self.publish(&inner.lines);

        if let Err(e) = self.persist_upsert(inner.auth, &line).await {
            inner.lines = snapshot;
            self.publish(&inner.lines);
            return Err(e);
        }

        Ok(MutationOutcome {
            lines: inner.lines.clone(),
            warning,
        })
    }

    async fn persist_upsert(&self, auth: AuthState, line: &CartLine) -> Result<(), CartError> {
        match auth {
            AuthState::Anonymous => self.session.upsert(line).await?,
            AuthState::Authenticated(user) => self.remote.upsert_line(user, line).await?,
        }
        Ok(())
    }

    async fn persist_delete(&self, auth: AuthState, line_id: CartLineId) -> Result<(), CartError> {
        match auth {
            AuthState::Anonymous => self.session.delete(line_id).await?,
            AuthState::Authenticated(user) => self.remote.delete_line(user, line_id).await?,
        }
        Ok(())
    }

    pub(crate) async fn persist_clear(&self, auth: AuthState) -> Result<(), CartError> {
        match auth {
            AuthState::Anonymous => self.session.clear().await?,
            AuthState::Authenticated(user) => self.remote.clear(user).await?,
        }
        Ok(())
    }

    pub(crate) fn publish(&self, lines: &[CartLine]) {
        self.changes.send_replace(lines.to_vec());
    }
}

fn warn_if_capped(
    decision: StockDecision,
    name: &str,
    product_id: ProductId,
) -> Option<StockWarning> {
    match decision {
        StockDecision::Approved(_) => None,
        StockDecision::Capped { granted, requested } => {
            warn!(%product_id, requested, granted, "quantity capped to available stock");
            Some(StockWarning {
                product_id,
                name: name.to_string(),
                requested,
                capped_to: granted,
            })
        }
    }
}
