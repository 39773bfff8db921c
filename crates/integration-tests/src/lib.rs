//! Test support for cart engine scenarios.
//!
//! Provides in-memory fakes of the persistence traits with failure injection,
//! plus helpers for building products and wired-up managers. The session side
//! uses a real `tower-sessions` memory store, so anonymous-cart persistence
//! is exercised for real.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use rust_decimal::Decimal;
use tower_sessions::{MemoryStore, Session};

use greengrocer_cart::db::RepositoryError;
use greengrocer_cart::{
    AuthState, CartLine, CartRepository, CartStateManager, ProductCatalog, ProductSnapshot,
    SessionCartStore,
};
use greengrocer_core::{CartLineId, CurrencyCode, Price, ProductId, UserId};

/// Initialize test logging once per process. `RUST_LOG` controls the filter.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolClosed)
}

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct CartRepoInner {
    carts: Mutex<HashMap<i32, Vec<CartLine>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

/// In-memory `CartRepository` with failure injection.
///
/// Cheaply cloneable; clones share state so a test can keep a handle for
/// seeding and assertions while the manager owns another.
#[derive(Clone, Default)]
pub struct MemoryCartRepository {
    inner: Arc<CartRepoInner>,
}

impl MemoryCartRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a user's persisted cart directly.
    pub fn seed(&self, user: UserId, lines: Vec<CartLine>) {
        self.inner.carts.lock().unwrap().insert(user.as_i32(), lines);
    }

    /// The persisted cart as stored, without failure injection.
    #[must_use]
    pub fn stored(&self, user: UserId) -> Vec<CartLine> {
        self.inner
            .carts
            .lock()
            .unwrap()
            .get(&user.as_i32())
            .cloned()
            .unwrap_or_default()
    }

    fn check_read(&self) -> Result<(), RepositoryError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), RepositoryError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }
}

impl CartRepository for MemoryCartRepository {
    async fn load(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        self.check_read()?;
        Ok(self.stored(user))
    }

    async fn save(&self, user: UserId, lines: &[CartLine]) -> Result<(), RepositoryError> {
        self.check_write()?;
        self.seed(user, lines.to_vec());
        Ok(())
    }

    async fn upsert_line(&self, user: UserId, line: &CartLine) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut carts = self.inner.carts.lock().unwrap();
        let lines = carts.entry(user.as_i32()).or_default();
        // Unique (user, product): a racing identical insert merges, never
        // duplicates.
        if let Some(existing) = lines.iter_mut().find(|l| l.product_id == line.product_id) {
            *existing = line.clone();
        } else {
            lines.push(line.clone());
        }
        Ok(())
    }

    async fn delete_line(
        &self,
        user: UserId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut carts = self.inner.carts.lock().unwrap();
        if let Some(lines) = carts.get_mut(&user.as_i32()) {
            lines.retain(|l| l.id != line_id);
        }
        Ok(())
    }

    async fn clear(&self, user: UserId) -> Result<(), RepositoryError> {
        self.check_write()?;
        self.inner.carts.lock().unwrap().remove(&user.as_i32());
        Ok(())
    }
}

#[derive(Default)]
struct CatalogInner {
    products: Mutex<HashMap<i32, ProductSnapshot>>,
    failing_stock_updates: Mutex<HashSet<i32>>,
}

/// In-memory `ProductCatalog` with per-product stock-update failure
/// injection.
#[derive(Clone, Default)]
pub struct MemoryProductCatalog {
    inner: Arc<CatalogInner>,
}

impl MemoryProductCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product row.
    pub fn insert(&self, product: ProductSnapshot) {
        self.inner
            .products
            .lock()
            .unwrap()
            .insert(product.id.as_i32(), product);
    }

    /// Drop a product row entirely.
    pub fn remove(&self, product_id: ProductId) {
        self.inner.products.lock().unwrap().remove(&product_id.as_i32());
    }

    /// Overwrite a product's stock (simulates drift from other clients).
    pub fn set_stock(&self, product_id: ProductId, stock: u32) {
        if let Some(product) = self
            .inner
            .products
            .lock()
            .unwrap()
            .get_mut(&product_id.as_i32())
        {
            product.stock = stock;
        }
    }

    /// Current stock for a product.
    #[must_use]
    pub fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.inner
            .products
            .lock()
            .unwrap()
            .get(&product_id.as_i32())
            .map(|p| p.stock)
    }

    /// Make `update_stock` fail for this product only.
    pub fn fail_stock_updates_for(&self, product_id: ProductId) {
        self.inner
            .failing_stock_updates
            .lock()
            .unwrap()
            .insert(product_id.as_i32());
    }
}

impl ProductCatalog for MemoryProductCatalog {
    async fn get(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        Ok(self
            .inner
            .products
            .lock()
            .unwrap()
            .get(&product_id.as_i32())
            .cloned())
    }

    async fn update_stock(
        &self,
        product_id: ProductId,
        new_stock: u32,
    ) -> Result<(), RepositoryError> {
        if self
            .inner
            .failing_stock_updates
            .lock()
            .unwrap()
            .contains(&product_id.as_i32())
        {
            return Err(injected_failure());
        }
        let mut products = self.inner.products.lock().unwrap();
        let product = products
            .get_mut(&product_id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        product.stock = new_stock;
        Ok(())
    }
}

// =============================================================================
// Builders
// =============================================================================

/// A valid product snapshot for tests.
#[must_use]
pub fn product(id: i32, name: &str, price_cents: i64, stock: u32) -> ProductSnapshot {
    ProductSnapshot::new(
        ProductId::new(id),
        name.to_string(),
        Price::new(Decimal::new(price_cents, 2), CurrencyCode::USD),
        stock,
        vec![format!("https://img.greengrocer.shop/{id}.jpg")],
    )
    .unwrap()
}

/// A session-backed cart store over a fresh memory store.
#[must_use]
pub fn session_store() -> SessionCartStore {
    SessionCartStore::new(Session::new(None, Arc::new(MemoryStore::default()), None))
}

/// Everything a scenario needs, with shared handles into the fakes.
pub struct TestRig {
    pub session: SessionCartStore,
    pub remote: MemoryCartRepository,
    pub catalog: MemoryProductCatalog,
    pub cart: CartStateManager<MemoryCartRepository, MemoryProductCatalog>,
}

/// Build a manager wired to fresh fakes.
#[must_use]
pub fn rig(initial_auth: AuthState) -> TestRig {
    init_tracing();
    let session = session_store();
    let remote = MemoryCartRepository::new();
    let catalog = MemoryProductCatalog::new();
    let cart = CartStateManager::new(
        session.clone(),
        remote.clone(),
        catalog.clone(),
        initial_auth,
    );
    TestRig {
        session,
        remote,
        catalog,
        cart,
    }
}

/// Assert the stock-ceiling invariant: every line has
/// `1 <= quantity <= product.stock`.
pub fn assert_invariants(lines: &[CartLine]) {
    for line in lines {
        assert!(line.quantity >= 1, "line {} has quantity 0", line.id);
        assert!(
            line.quantity <= line.product.stock,
            "line {} exceeds stock: {} > {}",
            line.id,
            line.quantity,
            line.product.stock
        );
    }
}
