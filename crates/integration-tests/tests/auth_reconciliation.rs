//! Login/logout reconciliation: which backend is authoritative.

#![allow(clippy::unwrap_used)]

use greengrocer_cart::{AuthEvent, AuthState, CartError, CartLine};
use greengrocer_core::{ProductId, UserId};
use greengrocer_integration_tests::{product, rig};

const APPLES: ProductId = ProductId::new(1);
const PEARS: ProductId = ProductId::new(2);
const CHERRIES: ProductId = ProductId::new(3);

const USER: UserId = UserId::new(42);

#[tokio::test]
async fn login_replaces_anonymous_cart_with_remote() {
    // Scenario C: anonymous {A, B}, persisted {C} => post-login {C}.
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.catalog.insert(product(2, "Pears", 200, 5));
    rig.cart.add_to_cart(APPLES, 1).await.unwrap();
    rig.cart.add_to_cart(PEARS, 1).await.unwrap();

    let remote_line = CartLine::new(product(3, "Cherries", 400, 8), 2);
    rig.remote.seed(USER, vec![remote_line.clone()]);

    let lines = rig.cart.on_auth_event(AuthEvent::LoggedIn(USER)).await.unwrap();

    assert_eq!(lines, vec![remote_line], "replaced, not merged");
    assert!(
        lines.iter().all(|l| l.product_id == CHERRIES),
        "anonymous items not carried over"
    );
    assert!(
        rig.session.load().await.unwrap().is_empty(),
        "session cart discarded"
    );
    assert_eq!(rig.cart.auth_state().await, AuthState::Authenticated(USER));
}

#[tokio::test]
async fn logout_clears_in_memory_cart() {
    let rig = rig(AuthState::Authenticated(USER));
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.cart.add_to_cart(APPLES, 2).await.unwrap();

    let lines = rig.cart.on_auth_event(AuthEvent::LoggedOut).await.unwrap();

    assert!(lines.is_empty());
    assert_eq!(rig.cart.auth_state().await, AuthState::Anonymous);
}

#[tokio::test]
async fn reentering_the_same_state_is_a_noop() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.cart.add_to_cart(APPLES, 1).await.unwrap();
    let before = rig.cart.lines().await;

    let lines = rig.cart.on_auth_event(AuthEvent::LoggedOut).await.unwrap();
    assert_eq!(lines, before);
    assert_eq!(rig.cart.auth_state().await, AuthState::Anonymous);
}

#[tokio::test]
async fn failed_remote_load_leaves_state_untouched() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.cart.add_to_cart(APPLES, 1).await.unwrap();
    let before = rig.cart.lines().await;

    rig.remote.fail_reads(true);
    let err = rig
        .cart
        .on_auth_event(AuthEvent::LoggedIn(USER))
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::Persistence(_)));
    assert_eq!(rig.cart.lines().await, before);
    assert_eq!(rig.cart.auth_state().await, AuthState::Anonymous);
}

#[tokio::test]
async fn authenticated_mutations_persist_to_remote_rows() {
    let rig = rig(AuthState::Anonymous);
    rig.catalog.insert(product(1, "Apples", 150, 5));
    rig.cart.on_auth_event(AuthEvent::LoggedIn(USER)).await.unwrap();

    rig.cart.add_to_cart(APPLES, 2).await.unwrap();

    let stored = rig.remote.stored(USER);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].quantity, 2);
    assert!(
        rig.session.load().await.unwrap().is_empty(),
        "session store untouched while authenticated"
    );
}

#[tokio::test]
async fn load_hydrates_from_the_authoritative_backend() {
    let rig = rig(AuthState::Authenticated(USER));
    let remote_line = CartLine::new(product(3, "Cherries", 400, 8), 1);
    rig.remote.seed(USER, vec![remote_line.clone()]);

    let lines = rig.cart.load().await.unwrap();
    assert_eq!(lines, vec![remote_line]);
}
