//! Concurrency tests: racing callers against the same cart or order.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use canteen_core::error::CanteenError;
use canteen_core::order::{OrderStatus, PaymentStatus};
use canteen_core::payment::{PaymentMethod, PaymentOutcome};
use canteen_engine::EngineConfig;
use canteen_testing::fixtures::{self, FRENCH_FRIES, VEGGIE_BURGER};
use common::{Harness, fast_config, item};
use futures::future::join_all;

const RACERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_succeed_exactly_once() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    let order = h.canteen.checkout(&alice).await.unwrap();

    let tasks = (0..RACERS).map(|_| {
        let canteen = h.canteen.clone();
        let alice = alice.clone();
        let id = order.id().clone();
        tokio::spawn(async move {
            canteen
                .resolve_payment(&alice, &id, PaymentMethod::Card, PaymentOutcome::Success)
                .await
        })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CanteenError::InvalidState(_)))
    );

    let stored = h.canteen.get_order(&alice, order.id()).await.unwrap();
    assert_eq!(stored.payment_status(), PaymentStatus::Paid);
    assert_eq!(stored.status(), OrderStatus::Preparing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_succeed_exactly_once() {
    let h = Harness::new();
    let alice = fixtures::alice();
    let chef = fixtures::chef();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    let order = h.canteen.checkout(&alice).await.unwrap();
    h.canteen
        .resolve_payment(&alice, order.id(), PaymentMethod::Cash, PaymentOutcome::Success)
        .await
        .unwrap();

    let tasks = (0..RACERS).map(|_| {
        let canteen = h.canteen.clone();
        let chef = chef.clone();
        let id = order.id().clone();
        tokio::spawn(async move { canteen.advance_order(&chef, &id, OrderStatus::Ready).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        CanteenError::IllegalTransition { .. } | CanteenError::InvalidState(_)
    )));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_lose_no_updates() {
    let h = Harness::with_config(EngineConfig::default().with_cas_attempts(256));
    let alice = fixtures::alice();

    let tasks = (0..RACERS).map(|i| {
        let canteen = h.canteen.clone();
        let alice = alice.clone();
        let id = if i % 2 == 0 { item(VEGGIE_BURGER) } else { item(FRENCH_FRIES) };
        tokio::spawn(async move { canteen.add_item(&alice, &id).await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let snapshot = h.canteen.cart(&alice).await.unwrap();
    assert_eq!(snapshot.item_count, RACERS as u64);
    assert_eq!(snapshot.lines.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checkout_racing_cart_edits_sees_one_consistent_cart() {
    let h = Harness::with_config(EngineConfig::default().with_cas_attempts(256));
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;

    let adds = (0..RACERS).map(|_| {
        let canteen = h.canteen.clone();
        let alice = alice.clone();
        tokio::spawn(async move { canteen.add_item(&alice, &item(FRENCH_FRIES)).await })
    });
    let checkout = {
        let canteen = h.canteen.clone();
        let alice = alice.clone();
        tokio::spawn(async move { canteen.checkout(&alice).await })
    };

    for result in join_all(adds).await {
        result.unwrap().unwrap();
    }
    let order = checkout.await.unwrap().unwrap();
    let left = h.canteen.cart(&alice).await.unwrap();

    // Every unit ended up either in the order or still in the cart.
    let ordered: u64 = order.lines().iter().map(|l| u64::from(l.quantity)).sum();
    assert_eq!(ordered + left.item_count, 1 + RACERS as u64);
    let sum: i64 = order.lines().iter().map(|l| l.subtotal().cents()).sum();
    assert_eq!(order.total_amount().cents(), sum);
}

#[tokio::test]
async fn conflicts_beyond_the_retry_budget_fail_invalid_state() {
    let h = Harness::with_config(fast_config().with_cas_attempts(3));
    let alice = fixtures::alice();

    h.repository.force_conflicts(3);
    let err = h.canteen.add_item(&alice, &item(VEGGIE_BURGER)).await.unwrap_err();
    assert!(matches!(err, CanteenError::InvalidState(_)));
    assert!(h.canteen.cart(&alice).await.unwrap().is_empty());

    h.repository.force_conflicts(2);
    let snapshot = h.canteen.add_item(&alice, &item(VEGGIE_BURGER)).await.unwrap();
    assert_eq!(snapshot.item_count, 1);
}

#[tokio::test]
async fn checkout_conflicts_are_retried_then_given_up() {
    let h = Harness::with_config(fast_config().with_cas_attempts(4));
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;

    h.repository.force_conflicts(4);
    let err = h.canteen.checkout(&alice).await.unwrap_err();
    assert!(matches!(err, CanteenError::InvalidState(_)));
    assert_eq!(h.repository.order_count(), 0);
    assert_eq!(h.canteen.cart(&alice).await.unwrap().item_count, 1);

    h.repository.force_conflicts(3);
    h.canteen.checkout(&alice).await.unwrap();
    assert_eq!(h.repository.order_count(), 1);
}
