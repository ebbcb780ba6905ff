//! Integration tests for the cart engine: live pricing, availability and
//! collaborator failures.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use canteen_core::error::CanteenError;
use canteen_core::money::Money;
use canteen_core::repository::Repository;
use canteen_core::types::ItemId;
use canteen_testing::fixtures::{self, FRENCH_FRIES, VEGGIE_BURGER};
use canteen_testing::properties::{menu_item_id, price};
use common::{Harness, item};
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Cart totals law
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add(ItemId),
    SetQuantity(ItemId, i64),
    Remove(ItemId),
    Reprice(ItemId, Money),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => menu_item_id().prop_map(Op::Add),
        2 => (menu_item_id(), -2i64..6).prop_map(|(id, q)| Op::SetQuantity(id, q)),
        1 => menu_item_id().prop_map(Op::Remove),
        1 => (menu_item_id(), price()).prop_map(|(id, p)| Op::Reprice(id, p)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn snapshot_amount_is_quantity_times_current_price(ops in prop::collection::vec(op(), 1..30)) {
        tokio_test::block_on(async {
            let h = Harness::new();
            let alice = fixtures::alice();

            let mut prices: HashMap<ItemId, i64> = fixtures::menu()
                .into_iter()
                .map(|i| (i.id, i.unit_price.cents()))
                .collect();
            let mut quantities: HashMap<ItemId, i64> = HashMap::new();

            for op in ops {
                match op {
                    Op::Add(id) => {
                        h.canteen.add_item(&alice, &id).await.unwrap();
                        *quantities.entry(id).or_default() += 1;
                    },
                    Op::SetQuantity(id, q) => {
                        h.canteen.set_quantity(&alice, &id, q).await.unwrap();
                        if q <= 0 {
                            quantities.remove(&id);
                        } else {
                            quantities.insert(id, q);
                        }
                    },
                    Op::Remove(id) => {
                        h.canteen.remove_item(&alice, &id).await.unwrap();
                        quantities.remove(&id);
                    },
                    Op::Reprice(id, p) => {
                        assert!(h.catalog.set_price(&id, p));
                        prices.insert(id, p.cents());
                    },
                }
            }

            let snapshot = h.canteen.cart(&alice).await.unwrap();
            let expected: i64 = quantities.iter().map(|(id, q)| q * prices[id]).sum();
            let expected_count: i64 = quantities.values().sum();

            assert_eq!(snapshot.amount.cents(), expected);
            assert_eq!(snapshot.item_count, u64::try_from(expected_count).unwrap());
            assert_eq!(snapshot.lines.len(), quantities.len());
            for line in &snapshot.lines {
                assert_eq!(line.subtotal.cents(), line.unit_price.cents() * i64::from(line.quantity));
            }
        });
    }
}

// ============================================================================
// Cart operations
// ============================================================================

#[tokio::test]
async fn adding_an_item_twice_increments_one_line() {
    let h = Harness::new();
    let alice = fixtures::alice();

    h.add(&alice, VEGGIE_BURGER, 2).await;
    let snapshot = h.canteen.cart(&alice).await.unwrap();

    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].quantity, 2);
    assert_eq!(snapshot.item_count, 2);
    assert_eq!(snapshot.amount, Money::from_cents(1598));
}

#[tokio::test]
async fn carts_are_priced_live() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, FRENCH_FRIES, 3).await;

    assert!(h.catalog.set_price(&item(FRENCH_FRIES), Money::from_cents(450)));
    let snapshot = h.canteen.cart(&alice).await.unwrap();

    assert_eq!(snapshot.amount, Money::from_cents(1350));
}

#[tokio::test]
async fn unavailable_items_cannot_be_added() {
    let h = Harness::new();
    let alice = fixtures::alice();
    assert!(h.catalog.set_available(&item(VEGGIE_BURGER), false));

    let err = h.canteen.add_item(&alice, &item(VEGGIE_BURGER)).await.unwrap_err();

    assert_eq!(err, CanteenError::ItemUnavailable(item(VEGGIE_BURGER)));
    assert!(h.canteen.cart(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_items_are_not_found() {
    let h = Harness::new();
    let err = h.canteen.add_item(&fixtures::alice(), &item("404")).await.unwrap_err();
    assert_eq!(err, CanteenError::item_not_found("404"));
}

#[tokio::test]
async fn set_quantity_replaces_and_zero_removes() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;

    let snapshot = h.canteen.set_quantity(&alice, &item(VEGGIE_BURGER), 5).await.unwrap();
    assert_eq!(snapshot.item_count, 5);

    let snapshot = h.canteen.set_quantity(&alice, &item(VEGGIE_BURGER), 0).await.unwrap();
    assert!(snapshot.is_empty());

    let snapshot = h.canteen.set_quantity(&alice, &item(FRENCH_FRIES), -3).await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn removing_an_absent_item_is_a_no_op() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, FRENCH_FRIES, 1).await;

    let snapshot = h.canteen.remove_item(&alice, &item(VEGGIE_BURGER)).await.unwrap();

    assert_eq!(snapshot.item_count, 1);
}

#[tokio::test]
async fn clear_empties_the_cart() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, FRENCH_FRIES, 2).await;
    h.add(&alice, VEGGIE_BURGER, 1).await;

    let snapshot = h.canteen.clear_cart(&alice).await.unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.amount, Money::ZERO);
}

#[tokio::test]
async fn carts_belong_to_one_user() {
    let h = Harness::new();
    h.add(&fixtures::alice(), VEGGIE_BURGER, 1).await;

    assert!(h.canteen.cart(&fixtures::bob()).await.unwrap().is_empty());
}

#[tokio::test]
async fn items_that_left_the_menu_block_the_snapshot_but_can_be_removed() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    h.add(&alice, FRENCH_FRIES, 1).await;
    assert!(h.catalog.remove(&item(VEGGIE_BURGER)));

    let err = h.canteen.cart(&alice).await.unwrap_err();
    assert_eq!(err, CanteenError::item_not_found(VEGGIE_BURGER));

    let snapshot = h.canteen.remove_item(&alice, &item(VEGGIE_BURGER)).await.unwrap();
    assert_eq!(snapshot.amount, Money::from_cents(399));
}

#[tokio::test]
async fn changes_that_cannot_be_priced_are_not_stored() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    let before = h.repository.load_cart(&alice.user_id).await.unwrap();
    assert!(h.catalog.remove(&item(VEGGIE_BURGER)));

    let err = h.canteen.add_item(&alice, &item(FRENCH_FRIES)).await.unwrap_err();
    assert_eq!(err, CanteenError::item_not_found(VEGGIE_BURGER));

    let after = h.repository.load_cart(&alice.user_id).await.unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.value.lines(), before.value.lines());
    assert_eq!(after.value.quantity_of(&item(FRENCH_FRIES)), 0);

    // Once the stale line is gone, a retry adds exactly one unit.
    h.canteen.remove_item(&alice, &item(VEGGIE_BURGER)).await.unwrap();
    let snapshot = h.canteen.add_item(&alice, &item(FRENCH_FRIES)).await.unwrap();
    assert_eq!(snapshot.item_count, 1);
    assert_eq!(snapshot.amount, Money::from_cents(399));
}

#[tokio::test]
async fn unavailable_lines_are_flagged_in_the_snapshot() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    assert!(h.catalog.set_available(&item(VEGGIE_BURGER), false));

    let snapshot = h.canteen.cart(&alice).await.unwrap();

    assert!(!snapshot.lines[0].available);
    assert_eq!(snapshot.amount, Money::from_cents(799));
}

// ============================================================================
// Collaborator failures
// ============================================================================

#[tokio::test]
async fn catalog_outage_is_dependency_unavailable() {
    let h = Harness::new();
    h.catalog.set_offline(true);

    let err = h.canteen.add_item(&fixtures::alice(), &item(VEGGIE_BURGER)).await.unwrap_err();

    assert!(matches!(err, CanteenError::DependencyUnavailable(_)));
}

#[tokio::test]
async fn repository_outage_is_dependency_unavailable() {
    let h = Harness::new();
    h.repository.set_offline(true);

    let err = h.canteen.cart(&fixtures::alice()).await.unwrap_err();

    assert!(matches!(err, CanteenError::DependencyUnavailable(_)));
}
