//! Fulfillment: staff-driven status transitions and the kitchen queue.

use crate::environment::CanteenEnvironment;
use crate::payment::record_order_event;
use crate::retry::{Attempt, retry_on_conflict};
use canteen_core::error::CanteenError;
use canteen_core::fulfillment::{FulfillmentAction, FulfillmentReducer};
use canteen_core::order::{Order, OrderStatus};
use canteen_core::reducer::Reducer;
use canteen_core::repository::{Repository, Versioned};
use canteen_core::types::{OrderId, Role};
use serde::Serialize;

/// Counts of active orders per kitchen stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    /// Paid orders still waiting for the kitchen. Always zero today, since
    /// payment moves an order straight to `preparing`.
    pub new: usize,
    /// Orders being prepared
    pub preparing: usize,
    /// Orders waiting at the counter
    pub ready: usize,
}

impl QueueSummary {
    fn count(orders: &[Order]) -> Self {
        orders.iter().fold(Self::default(), |mut summary, order| {
            match order.status() {
                OrderStatus::Pending if order.in_staff_queue() => summary.new += 1,
                OrderStatus::Preparing => summary.preparing += 1,
                OrderStatus::Ready => summary.ready += 1,
                _ => {},
            }
            summary
        })
    }
}

/// Status transitions and the staff queue.
#[derive(Clone, Debug)]
pub struct Fulfillment {
    env: CanteenEnvironment,
}

impl Fulfillment {
    /// Creates the fulfillment service
    #[must_use]
    pub const fn new(env: CanteenEnvironment) -> Self {
        Self { env }
    }

    /// Move an order one step along the status graph.
    ///
    /// # Errors
    ///
    /// - [`CanteenError::NotFound`] if there is no such order
    /// - [`CanteenError::Forbidden`] if `actor` is not staff
    /// - [`CanteenError::IllegalTransition`] if the graph has no staff edge
    ///   from the current status to `target`
    pub async fn advance(&self, order_id: &OrderId, target: OrderStatus, actor: Role) -> Result<Order, CanteenError> {
        let repository = &self.env.repository;
        let order_env = &self.env.order_environment();

        let (order, events) = retry_on_conflict(&self.env.config, "status transition", move || async move {
            let Versioned { value: mut order, version } = repository
                .load_order(order_id)
                .await?
                .ok_or_else(|| CanteenError::order_not_found(order_id))?;

            let events = FulfillmentReducer
                .reduce(&mut order, FulfillmentAction::Advance { target, actor }, order_env)
                .inspect_err(|err| {
                    tracing::warn!(order_id = %order_id, target = %target, error = %err, "Transition rejected");
                })?;
            order.check_consistency()?;

            repository.save_order(&order, version).await?;
            Ok::<_, Attempt>((order, events))
        })
        .await?;

        for event in &events {
            record_order_event(event);
        }
        Ok(order)
    }

    /// Paid orders that are not finished, oldest first.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn staff_queue(&self) -> Result<Vec<Order>, CanteenError> {
        let mut orders: Vec<Order> = self
            .env
            .repository
            .list_orders(None)
            .await?
            .into_iter()
            .filter(Order::in_staff_queue)
            .collect();
        orders.sort_by_key(Order::created_at);
        Ok(orders)
    }

    /// How many queued orders sit in each stage.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn queue_summary(&self) -> Result<QueueSummary, CanteenError> {
        let queue = self.staff_queue().await?;
        Ok(QueueSummary::count(&queue))
    }
}
