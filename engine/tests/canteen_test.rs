//! Integration tests for the caller-aware facade: authentication, who may
//! see and do what, favorites and the menu.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use canteen_core::catalog::MenuFilter;
use canteen_core::error::{CanteenError, Entity};
use canteen_core::identity::{Credential, IdentityError};
use canteen_core::order::OrderStatus;
use canteen_core::payment::{PaymentMethod, PaymentOutcome};
use canteen_testing::fixtures::{self, CHICKEN_WRAP, FRENCH_FRIES, VEGGIE_BURGER};
use common::{Harness, item};

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn credentials_resolve_to_callers() {
    let h = Harness::new();

    let caller = h.canteen.authenticate(&Credential::new("chef-token")).await.unwrap();

    assert_eq!(caller, fixtures::chef());
    assert!(caller.is_staff());
}

#[tokio::test]
async fn unknown_credentials_are_unauthenticated() {
    let h = Harness::new();

    let err = h.canteen.authenticate(&Credential::new("forged")).await.unwrap_err();

    assert_eq!(err, IdentityError::Unauthenticated);
}

#[tokio::test]
async fn identity_outage_maps_to_dependency_unavailable() {
    let h = Harness::new();
    h.identity.set_offline(true);

    let err = h.canteen.authenticate(&Credential::new("alice-token")).await.unwrap_err();

    assert!(matches!(err, IdentityError::Unavailable(_)));
    assert!(matches!(
        CanteenError::from(err),
        CanteenError::DependencyUnavailable(_)
    ));
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn orders_are_visible_to_their_owner_and_staff_only() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    let order = h.canteen.checkout(&alice).await.unwrap();

    assert!(h.canteen.get_order(&alice, order.id()).await.is_ok());
    assert!(h.canteen.get_order(&fixtures::chef(), order.id()).await.is_ok());
    let err = h.canteen.get_order(&fixtures::bob(), order.id()).await.unwrap_err();
    assert!(matches!(err, CanteenError::Forbidden(_)));
}

#[tokio::test]
async fn only_the_owner_or_staff_may_record_a_payment() {
    let h = Harness::new();
    let alice = fixtures::alice();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    let order = h.canteen.checkout(&alice).await.unwrap();

    let err = h
        .canteen
        .resolve_payment(&fixtures::bob(), order.id(), PaymentMethod::Card, PaymentOutcome::Success)
        .await
        .unwrap_err();
    assert!(matches!(err, CanteenError::Forbidden(_)));

    let paid = h
        .canteen
        .resolve_payment(&fixtures::chef(), order.id(), PaymentMethod::Cash, PaymentOutcome::Success)
        .await
        .unwrap();
    assert_eq!(paid.status(), OrderStatus::Preparing);
}

#[tokio::test]
async fn staff_views_are_refused_to_customers() {
    let h = Harness::new();
    let alice = fixtures::alice();

    assert!(matches!(
        h.canteen.list_all_orders(&alice, None).await,
        Err(CanteenError::Forbidden(_))
    ));
    assert!(matches!(
        h.canteen.staff_queue(&alice).await,
        Err(CanteenError::Forbidden(_))
    ));
    assert!(matches!(
        h.canteen.queue_summary(&alice).await,
        Err(CanteenError::Forbidden(_))
    ));
}

#[tokio::test]
async fn customers_only_list_their_own_orders() {
    let h = Harness::new();
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    h.add(&alice, VEGGIE_BURGER, 1).await;
    h.canteen.checkout(&alice).await.unwrap();

    assert_eq!(h.canteen.list_my_orders(&alice, None).await.unwrap().len(), 1);
    assert!(h.canteen.list_my_orders(&bob, None).await.unwrap().is_empty());
    assert_eq!(h.canteen.list_all_orders(&fixtures::chef(), None).await.unwrap().len(), 1);
}

// ============================================================================
// Menu and favorites
// ============================================================================

#[tokio::test]
async fn menu_lists_everything_without_a_filter() {
    let h = Harness::new();

    let items = h.canteen.list_menu(&MenuFilter::default()).await.unwrap();

    assert_eq!(items.len(), fixtures::MENU_IDS.len());
}

#[tokio::test]
async fn favorites_round_trip() {
    let h = Harness::new();
    let alice = fixtures::alice();

    h.canteen.add_favorite(&alice, &item(VEGGIE_BURGER)).await.unwrap();
    h.canteen.add_favorite(&alice, &item(CHICKEN_WRAP)).await.unwrap();
    h.canteen.add_favorite(&alice, &item(VEGGIE_BURGER)).await.unwrap();

    let names: Vec<_> = h
        .canteen
        .list_favorites(&alice)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["Veggie Burger", "Chicken Wrap"]);
    assert!(h.canteen.is_favorite(&alice, &item(CHICKEN_WRAP)).await.unwrap());
    assert!(!h.canteen.is_favorite(&alice, &item(FRENCH_FRIES)).await.unwrap());
    assert!(h.canteen.list_favorites(&fixtures::bob()).await.unwrap().is_empty());

    h.canteen.remove_favorite(&alice, &item(VEGGIE_BURGER)).await.unwrap();
    let err = h.canteen.remove_favorite(&alice, &item(VEGGIE_BURGER)).await.unwrap_err();
    assert!(matches!(
        err,
        CanteenError::NotFound {
            entity: Entity::Favorite,
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_items_cannot_be_favorited() {
    let h = Harness::new();

    let err = h.canteen.add_favorite(&fixtures::alice(), &item("404")).await.unwrap_err();

    assert_eq!(err, CanteenError::item_not_found("404"));
}
