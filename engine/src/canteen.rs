//! Caller-aware facade over the engine services.
//!
//! Every operation takes the resolved [`Caller`] and decides what they may
//! touch: customers work on their own cart, orders and favorites; staff may
//! also read every order, run the queue and record counter payments.

use crate::cart::CartEngine;
use crate::environment::CanteenEnvironment;
use crate::fulfillment::{Fulfillment, QueueSummary};
use crate::ledger::OrderLedger;
use crate::menu::Menu;
use crate::payment::PaymentGate;
use canteen_core::cart::CartSnapshot;
use canteen_core::catalog::{CatalogItem, MenuFilter};
use canteen_core::error::CanteenError;
use canteen_core::identity::{Credential, Identity, IdentityError};
use canteen_core::order::{Order, OrderStatus};
use canteen_core::payment::{PaymentMethod, PaymentOutcome};
use canteen_core::types::{Caller, ItemId, OrderId};

fn require_staff(caller: &Caller, what: &str) -> Result<(), CanteenError> {
    if caller.is_staff() {
        Ok(())
    } else {
        tracing::warn!(user_id = %caller.user_id, what, "Staff-only operation refused");
        Err(CanteenError::Forbidden(format!("only staff may {what}")))
    }
}

fn require_owner_or_staff(caller: &Caller, order: &Order) -> Result<(), CanteenError> {
    if caller.is_staff() || order.user_id() == &caller.user_id {
        Ok(())
    } else {
        tracing::warn!(user_id = %caller.user_id, order_id = %order.id(), "Access to another user's order refused");
        Err(CanteenError::Forbidden(format!(
            "order {} belongs to another user",
            order.id()
        )))
    }
}

/// The canteen, as seen by an authenticated caller.
#[derive(Clone, Debug)]
pub struct Canteen {
    env: CanteenEnvironment,
    carts: CartEngine,
    ledger: OrderLedger,
    payments: PaymentGate,
    fulfillment: Fulfillment,
    menu: Menu,
}

impl Canteen {
    /// Wire every service to one environment.
    #[must_use]
    pub fn new(env: CanteenEnvironment) -> Self {
        Self {
            carts: CartEngine::new(env.clone()),
            ledger: OrderLedger::new(env.clone()),
            payments: PaymentGate::new(env.clone()),
            fulfillment: Fulfillment::new(env.clone()),
            menu: Menu::new(env.clone()),
            env,
        }
    }

    /// Resolve a credential through the identity collaborator.
    ///
    /// # Errors
    ///
    /// [`IdentityError::Unauthenticated`] for an unknown credential,
    /// [`IdentityError::Unavailable`] if the provider is down.
    pub async fn authenticate(&self, credential: &Credential) -> Result<Caller, IdentityError> {
        self.env.identity.resolve_caller(credential).await.inspect_err(|err| match err {
            IdentityError::Unauthenticated => tracing::debug!("Unknown credential"),
            IdentityError::Unavailable(_) => tracing::error!(error = %err, "Identity lookup failed"),
        })
    }

    /// The environment the services run against.
    #[must_use]
    pub const fn env(&self) -> &CanteenEnvironment {
        &self.env
    }

    /// Cart engine, without caller checks.
    #[must_use]
    pub const fn carts(&self) -> &CartEngine {
        &self.carts
    }

    /// Order ledger, without caller checks.
    #[must_use]
    pub const fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    /// Payment gate, without caller checks.
    #[must_use]
    pub const fn payments(&self) -> &PaymentGate {
        &self.payments
    }

    /// Fulfillment service, without caller checks.
    #[must_use]
    pub const fn fulfillment(&self) -> &Fulfillment {
        &self.fulfillment
    }

    /// Menu service, without caller checks.
    #[must_use]
    pub const fn menu(&self) -> &Menu {
        &self.menu
    }

    // Menu

    /// List the menu. Open to everyone.
    ///
    /// # Errors
    ///
    /// [`CanteenError::DependencyUnavailable`] if the catalog is down.
    pub async fn list_menu(&self, filter: &MenuFilter) -> Result<Vec<CatalogItem>, CanteenError> {
        self.menu.list(filter).await
    }

    // Cart

    /// See [`CartEngine::add_item`].
    ///
    /// # Errors
    ///
    /// As [`CartEngine::add_item`].
    pub async fn add_item(&self, caller: &Caller, item_id: &ItemId) -> Result<CartSnapshot, CanteenError> {
        self.carts.add_item(&caller.user_id, item_id).await
    }

    /// See [`CartEngine::set_quantity`].
    ///
    /// # Errors
    ///
    /// As [`CartEngine::set_quantity`].
    pub async fn set_quantity(
        &self,
        caller: &Caller,
        item_id: &ItemId,
        quantity: i64,
    ) -> Result<CartSnapshot, CanteenError> {
        self.carts.set_quantity(&caller.user_id, item_id, quantity).await
    }

    /// See [`CartEngine::remove_item`].
    ///
    /// # Errors
    ///
    /// As [`CartEngine::remove_item`].
    pub async fn remove_item(&self, caller: &Caller, item_id: &ItemId) -> Result<CartSnapshot, CanteenError> {
        self.carts.remove_item(&caller.user_id, item_id).await
    }

    /// See [`CartEngine::clear`].
    ///
    /// # Errors
    ///
    /// As [`CartEngine::clear`].
    pub async fn clear_cart(&self, caller: &Caller) -> Result<CartSnapshot, CanteenError> {
        self.carts.clear(&caller.user_id).await
    }

    /// See [`CartEngine::snapshot`].
    ///
    /// # Errors
    ///
    /// As [`CartEngine::snapshot`].
    pub async fn cart(&self, caller: &Caller) -> Result<CartSnapshot, CanteenError> {
        self.carts.snapshot(&caller.user_id).await
    }

    // Orders

    /// Check out the caller's own cart.
    ///
    /// # Errors
    ///
    /// As [`OrderLedger::checkout`].
    pub async fn checkout(&self, caller: &Caller) -> Result<Order, CanteenError> {
        self.ledger.checkout(&caller.user_id).await
    }

    /// Record a payment outcome. The order's owner pays online; staff record
    /// payments taken at the counter.
    ///
    /// # Errors
    ///
    /// [`CanteenError::Forbidden`] for someone else's order, otherwise as
    /// [`PaymentGate::resolve`].
    pub async fn resolve_payment(
        &self,
        caller: &Caller,
        order_id: &OrderId,
        method: PaymentMethod,
        outcome: PaymentOutcome,
    ) -> Result<Order, CanteenError> {
        let order = self.ledger.get(order_id).await?;
        require_owner_or_staff(caller, &order)?;
        self.payments.resolve(order_id, method, outcome).await
    }

    /// Fetch an order the caller owns, or any order for staff.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`], or [`CanteenError::Forbidden`] for a
    /// customer asking about someone else's order.
    pub async fn get_order(&self, caller: &Caller, order_id: &OrderId) -> Result<Order, CanteenError> {
        let order = self.ledger.get(order_id).await?;
        require_owner_or_staff(caller, &order)?;
        Ok(order)
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn list_my_orders(
        &self,
        caller: &Caller,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CanteenError> {
        self.ledger.list_by_user(&caller.user_id, status).await
    }

    /// Every order, newest first. Staff only.
    ///
    /// # Errors
    ///
    /// [`CanteenError::Forbidden`] for customers.
    pub async fn list_all_orders(
        &self,
        caller: &Caller,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CanteenError> {
        require_staff(caller, "list all orders")?;
        self.ledger.list_all(status).await
    }

    /// Copy one of the caller's past orders into their cart.
    ///
    /// # Errors
    ///
    /// As [`OrderLedger::reorder`].
    pub async fn reorder(&self, caller: &Caller, order_id: &OrderId) -> Result<CartSnapshot, CanteenError> {
        self.ledger.reorder(&caller.user_id, order_id).await
    }

    // Fulfillment

    /// Move an order along the status graph as the caller.
    ///
    /// # Errors
    ///
    /// As [`Fulfillment::advance`]; customers always get
    /// [`CanteenError::Forbidden`] for an existing order.
    pub async fn advance_order(
        &self,
        caller: &Caller,
        order_id: &OrderId,
        target: OrderStatus,
    ) -> Result<Order, CanteenError> {
        self.fulfillment.advance(order_id, target, caller.role).await
    }

    /// The kitchen queue. Staff only.
    ///
    /// # Errors
    ///
    /// [`CanteenError::Forbidden`] for customers.
    pub async fn staff_queue(&self, caller: &Caller) -> Result<Vec<Order>, CanteenError> {
        require_staff(caller, "view the queue")?;
        self.fulfillment.staff_queue().await
    }

    /// Queue counts per stage. Staff only.
    ///
    /// # Errors
    ///
    /// [`CanteenError::Forbidden`] for customers.
    pub async fn queue_summary(&self, caller: &Caller) -> Result<QueueSummary, CanteenError> {
        require_staff(caller, "view the queue")?;
        self.fulfillment.queue_summary().await
    }

    // Favorites

    /// See [`Menu::add_favorite`].
    ///
    /// # Errors
    ///
    /// As [`Menu::add_favorite`].
    pub async fn add_favorite(&self, caller: &Caller, item_id: &ItemId) -> Result<(), CanteenError> {
        self.menu.add_favorite(&caller.user_id, item_id).await
    }

    /// See [`Menu::remove_favorite`].
    ///
    /// # Errors
    ///
    /// As [`Menu::remove_favorite`].
    pub async fn remove_favorite(&self, caller: &Caller, item_id: &ItemId) -> Result<(), CanteenError> {
        self.menu.remove_favorite(&caller.user_id, item_id).await
    }

    /// See [`Menu::list_favorites`].
    ///
    /// # Errors
    ///
    /// As [`Menu::list_favorites`].
    pub async fn list_favorites(&self, caller: &Caller) -> Result<Vec<CatalogItem>, CanteenError> {
        self.menu.list_favorites(&caller.user_id).await
    }

    /// See [`Menu::is_favorite`].
    ///
    /// # Errors
    ///
    /// As [`Menu::is_favorite`].
    pub async fn is_favorite(&self, caller: &Caller, item_id: &ItemId) -> Result<bool, CanteenError> {
        self.menu.is_favorite(&caller.user_id, item_id).await
    }
}
