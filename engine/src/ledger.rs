//! Order ledger: turns carts into immutable priced orders and indexes them.

use crate::cart::{CartEngine, price_cart};
use crate::environment::CanteenEnvironment;
use crate::metrics::LedgerMetrics;
use crate::retry::{Attempt, retry_on_conflict};
use canteen_core::cart::{CartLine, CartSnapshot};
use canteen_core::environment::{Clock, IdGenerator};
use canteen_core::error::{CanteenError, Entity};
use canteen_core::order::{NewOrder, Order, OrderStatus};
use canteen_core::repository::{Repository, Versioned};
use canteen_core::types::{ItemId, OrderId, UserId};

/// Newest first. Orders created in the same instant keep the newest-inserted first.
pub(crate) fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.reverse();
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    orders
}

fn with_status(orders: Vec<Order>, status: Option<OrderStatus>) -> Vec<Order> {
    match status {
        Some(status) => orders.into_iter().filter(|o| o.status() == status).collect(),
        None => orders,
    }
}

/// An item that was once ordered and has since left the catalog is unavailable,
/// not unknown.
fn left_the_menu_is_unavailable(err: CanteenError) -> CanteenError {
    match err {
        CanteenError::NotFound {
            entity: Entity::Item,
            id,
        } => CanteenError::ItemUnavailable(ItemId::new(id)),
        other => other,
    }
}

/// Checkout, lookups and listings.
#[derive(Clone, Debug)]
pub struct OrderLedger {
    env: CanteenEnvironment,
    carts: CartEngine,
}

impl OrderLedger {
    /// Creates the ledger
    #[must_use]
    pub fn new(env: CanteenEnvironment) -> Self {
        let carts = CartEngine::new(env.clone());
        Self { env, carts }
    }

    /// Turn the user's cart into a `pending`/`pending` order and empty the cart,
    /// as one step.
    ///
    /// Lines are priced at the catalog's current prices. If the cart changes
    /// while checkout runs, checkout starts over from the new cart.
    ///
    /// # Errors
    ///
    /// - [`CanteenError::EmptyCart`] if the cart has no lines
    /// - [`CanteenError::ItemUnavailable`] if any item can no longer be ordered,
    ///   including items that left the catalog
    /// - [`CanteenError::InvalidState`] if the cart kept changing underneath
    ///
    /// The cart is untouched on every error.
    pub async fn checkout(&self, user_id: &UserId) -> Result<Order, CanteenError> {
        let env = &self.env;

        let order = retry_on_conflict(&env.config, "checkout", move || async move {
            let Versioned { value: cart, version } = env.repository.load_cart(user_id).await?;
            if cart.is_empty() {
                tracing::warn!(user_id = %user_id, "Checkout of an empty cart");
                return Err(CanteenError::EmptyCart.into());
            }

            let snapshot: CartSnapshot = price_cart(env.catalog.as_ref(), &cart)
                .await
                .map_err(left_the_menu_is_unavailable)?;
            let new = NewOrder {
                id: env.ids.order_id(),
                pickup_code: env.ids.pickup_code(),
                created_at: env.clock.now(),
            };
            let order = Order::from_snapshot(new, &snapshot).inspect_err(|err| {
                tracing::warn!(user_id = %user_id, error = %err, "Checkout rejected");
            })?;
            order.check_consistency()?;

            env.repository.commit_checkout(&order, version).await?;
            Ok::<_, Attempt>(order)
        })
        .await?;

        LedgerMetrics::record_checkout(order.total_amount().cents());
        tracing::info!(
            order_id = %order.id(),
            user_id = %user_id,
            total = %order.total_amount(),
            lines = order.lines().len(),
            prep_time_minutes = order.prep_time_minutes(),
            pickup_code = %order.pickup_code(),
            "Order placed"
        );
        Ok(order)
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] if there is no such order.
    pub async fn get(&self, order_id: &OrderId) -> Result<Order, CanteenError> {
        self.env
            .repository
            .load_order(order_id)
            .await?
            .map(|o| o.value)
            .ok_or_else(|| CanteenError::order_not_found(order_id))
    }

    /// A user's orders, newest first, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn list_by_user(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CanteenError> {
        let orders = self.env.repository.list_orders(Some(user_id)).await?;
        Ok(newest_first(with_status(orders, status)))
    }

    /// Every order, newest first, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, CanteenError> {
        let orders = self.env.repository.list_orders(None).await?;
        Ok(newest_first(with_status(orders, status)))
    }

    /// Copy a previous order's items into the user's cart, adding to any
    /// quantities already there.
    ///
    /// # Errors
    ///
    /// - [`CanteenError::NotFound`] if the order does not exist
    /// - [`CanteenError::Forbidden`] if it belongs to someone else
    /// - [`CanteenError::ItemUnavailable`] if any item can no longer be ordered
    ///   or left the catalog; the cart is left as it was
    pub async fn reorder(&self, user_id: &UserId, order_id: &OrderId) -> Result<CartSnapshot, CanteenError> {
        let order = self.get(order_id).await?;
        if order.user_id() != user_id {
            return Err(CanteenError::Forbidden(format!(
                "order {order_id} belongs to another user"
            )));
        }

        let lines = order
            .lines()
            .iter()
            .map(|l| CartLine::new(l.item_id.clone(), l.quantity))
            .collect();
        let snapshot = self
            .carts
            .add_lines(user_id, lines)
            .await
            .map_err(left_the_menu_is_unavailable)?;
        tracing::info!(order_id = %order_id, user_id = %user_id, "Order copied into cart");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteen_core::cart::PricedLine;
    use canteen_core::money::Money;
    use canteen_core::types::PickupCode;
    use canteen_testing::test_clock;

    #[allow(clippy::unwrap_used)]
    fn order(id: &str, offset_secs: i64) -> Order {
        let unit_price = Money::from_cents(100);
        let snapshot = CartSnapshot {
            user_id: UserId::new("u"),
            lines: vec![PricedLine {
                item_id: ItemId::new("1"),
                name: "Thing".into(),
                unit_price,
                quantity: 1,
                subtotal: unit_price,
                available: true,
                prep_time_minutes: 1,
            }],
            item_count: 1,
            amount: unit_price,
        };
        Order::from_snapshot(
            NewOrder {
                id: OrderId::new(id),
                pickup_code: PickupCode::new(format!("ORD-{id}")),
                created_at: test_clock().now() + chrono::Duration::seconds(offset_secs),
            },
            &snapshot,
        )
        .unwrap()
    }

    #[test]
    fn newest_first_breaks_ties_by_insertion() {
        let sorted = newest_first(vec![order("a", 0), order("b", 5), order("c", 0)]);
        let ids: Vec<_> = sorted.iter().map(|o| o.id().as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }
}
