//! Cart mutation scenarios: optimistic updates, stock clamping, and rollback.

#![allow(clippy::unwrap_used)]

use greengrocer_cart::{AuthState, CartError};
use greengrocer_core::{CartLineId, ProductId, UserId};
use greengrocer_integration_tests::{assert_invariants, product, rig};
use rust_decimal::Decimal;

const APPLES: ProductId = ProductId::new(1);
const PEARS: ProductId = ProductId::new(2);

#[tokio::test]
async fn add_creates_line_and_persists_to_session() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 10));

    let outcome = rig.cart.add_to_cart(APPLES, 2).await.unwrap();
    assert_eq!(outcome.lines.len(), 1);
    assert_eq!(outcome.lines[0].quantity, 2);
    assert!(outcome.warning.is_none());
    assert_invariants(&outcome.lines);

    // Anonymous carts persist to the session store.
    assert_eq!(rig.session.load().await.unwrap(), outcome.lines);
}

#[tokio::test]
async fn repeat_add_clamps_to_stock_and_warns() {
    // Scenario A: stock=5, add 3 then add 3 again.
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));

    let first = rig.cart.add_to_cart(APPLES, 3).await.unwrap();
    assert!(first.warning.is_none());

    let second = rig.cart.add_to_cart(APPLES, 3).await.unwrap();
    assert_eq!(second.lines.len(), 1);
    assert_eq!(second.lines[0].quantity, 5, "clamped to stock, not 6");

    let warning = second.warning.unwrap();
    assert_eq!(warning.product_id, APPLES);
    assert_eq!(warning.requested, 6);
    assert_eq!(warning.capped_to, 5);
    assert_invariants(&second.lines);
}

#[tokio::test]
async fn add_at_ceiling_changes_nothing_but_still_warns() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));

    rig.cart.add_to_cart(APPLES, 5).await.unwrap();
    let outcome = rig.cart.add_to_cart(APPLES, 1).await.unwrap();

    assert_eq!(outcome.lines[0].quantity, 5);
    assert!(outcome.warning.is_some());
}

#[tokio::test]
async fn fresh_add_over_stock_is_rejected() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 2));

    let err = rig.cart.add_to_cart(APPLES, 3).await.unwrap_err();
    assert!(matches!(
        err,
        CartError::StockExceeded {
            requested: 3,
            available: 2,
            ..
        }
    ));
    assert!(rig.cart.lines().await.is_empty(), "state unchanged");
}

#[tokio::test]
async fn add_unknown_product_is_rejected() {
    let rig = rig(AuthState::Anonymous);

    let err = rig.cart.add_to_cart(APPLES, 1).await.unwrap_err();
    assert!(matches!(err, CartError::ProductNotFound(id) if id == APPLES));
}

#[tokio::test]
async fn add_zero_quantity_is_rejected() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 10));

    let err = rig.cart.add_to_cart(APPLES, 0).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity));
}

#[tokio::test]
async fn update_quantity_caps_and_warns() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    let added = rig.cart.add_to_cart(APPLES, 2).await.unwrap();
    let line_id = added.lines[0].id;

    let outcome = rig.cart.update_quantity(line_id, 9).await.unwrap();
    assert_eq!(outcome.lines[0].quantity, 5);
    let warning = outcome.warning.unwrap();
    assert_eq!(warning.requested, 9);
    assert_eq!(warning.capped_to, 5);
    assert_invariants(&outcome.lines);
}

#[tokio::test]
async fn update_to_current_quantity_is_a_noop() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    let added = rig.cart.add_to_cart(APPLES, 2).await.unwrap();
    let line_id = added.lines[0].id;

    let before = rig.cart.lines().await;
    let outcome = rig.cart.update_quantity(line_id, 2).await.unwrap();
    assert_eq!(outcome.lines, before);
    assert!(outcome.warning.is_none());
    assert_eq!(rig.session.load().await.unwrap(), before);
}

#[tokio::test]
async fn update_to_zero_removes_the_line() {
    // Scenario D: line count decreases by one.
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.catalog.insert(product(2, "Pears", 200, 5));
    rig.cart.add_to_cart(APPLES, 1).await.unwrap();
    let added = rig.cart.add_to_cart(PEARS, 1).await.unwrap();
    let pears_line = added.lines[1].id;

    let outcome = rig.cart.update_quantity(pears_line, 0).await.unwrap();
    assert_eq!(outcome.lines.len(), 1);
    assert_eq!(outcome.lines[0].product_id, APPLES);
}

#[tokio::test]
async fn update_unknown_line_is_rejected() {
    let rig = rig(AuthState::Anonymous);

    let missing = CartLineId::generate();
    let err = rig.cart.update_quantity(missing, 3).await.unwrap_err();
    assert!(matches!(err, CartError::LineNotFound(id) if id == missing));
}

#[tokio::test]
async fn add_then_remove_restores_prior_line_set() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.catalog.insert(product(2, "Pears", 200, 5));
    rig.cart.add_to_cart(APPLES, 1).await.unwrap();
    let before = rig.cart.lines().await;

    let added = rig.cart.add_to_cart(PEARS, 1).await.unwrap();
    let pears_line = added.lines[1].id;
    let outcome = rig.cart.remove_from_cart(pears_line).await.unwrap();

    assert_eq!(outcome.lines, before);
    assert_eq!(rig.session.load().await.unwrap(), before);
}

#[tokio::test]
async fn failed_add_reverts_in_memory_state() {
    let user = UserId::new(7);
    let rig = rig(AuthState::Authenticated(user));
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.remote.fail_writes(true);

    let err = rig.cart.add_to_cart(APPLES, 2).await.unwrap_err();
    assert!(matches!(err, CartError::Persistence(_)));
    assert!(rig.cart.lines().await.is_empty(), "optimistic add reverted");
    assert!(rig.remote.stored(user).is_empty());
}

#[tokio::test]
async fn failed_remove_reinserts_the_line() {
    let user = UserId::new(7);
    let rig = rig(AuthState::Authenticated(user));
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.catalog.insert(product(2, "Pears", 200, 5));
    rig.cart.add_to_cart(APPLES, 1).await.unwrap();
    let added = rig.cart.add_to_cart(PEARS, 1).await.unwrap();
    let before = added.lines.clone();

    rig.remote.fail_writes(true);
    let err = rig.cart.remove_from_cart(before[0].id).await.unwrap_err();
    assert!(matches!(err, CartError::Persistence(_)));
    assert_eq!(rig.cart.lines().await, before, "line back at its position");
}

#[tokio::test]
async fn clear_cart_empties_memory_and_backend() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.cart.add_to_cart(APPLES, 2).await.unwrap();

    let outcome = rig.cart.clear_cart().await.unwrap();
    assert!(outcome.lines.is_empty());
    assert!(rig.session.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn subscribers_see_each_committed_state() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    let mut updates = rig.cart.subscribe();

    rig.cart.add_to_cart(APPLES, 2).await.unwrap();
    assert_eq!(updates.borrow_and_update().len(), 1);

    rig.cart.clear_cart().await.unwrap();
    assert!(updates.borrow_and_update().is_empty());
}

#[tokio::test]
async fn accessors_report_counts_and_subtotal() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 10));
    rig.catalog.insert(product(2, "Pears", 200, 10));
    rig.cart.add_to_cart(APPLES, 2).await.unwrap();
    rig.cart.add_to_cart(PEARS, 3).await.unwrap();

    assert_eq!(rig.cart.item_count().await, 5);
    assert_eq!(rig.cart.subtotal().await, Decimal::new(900, 2));
}
