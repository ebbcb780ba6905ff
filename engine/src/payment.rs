//! Payment gate: records the one outcome an order's payment can have.

use crate::environment::CanteenEnvironment;
use crate::metrics::{FulfillmentMetrics, PaymentMetrics};
use crate::retry::{Attempt, retry_on_conflict};
use canteen_core::error::CanteenError;
use canteen_core::order::{Order, OrderEvent};
use canteen_core::payment::{PaymentAction, PaymentMethod, PaymentOutcome, PaymentReducer};
use canteen_core::reducer::Reducer;
use canteen_core::repository::{Repository, Versioned};
use canteen_core::types::OrderId;

/// Log an applied order event and count it.
pub(crate) fn record_order_event(event: &OrderEvent) {
    match event {
        OrderEvent::PaymentCaptured { order_id, method, .. } => {
            tracing::info!(order_id = %order_id, method = %method, "Payment captured");
        },
        OrderEvent::PaymentDeclined {
            order_id,
            method,
            reason,
            ..
        } => {
            tracing::info!(order_id = %order_id, method = %method, reason = %reason, "Payment declined");
        },
        OrderEvent::StatusChanged { order_id, from, to, .. } => {
            FulfillmentMetrics::record_transition(*to);
            tracing::info!(order_id = %order_id, from = %from, status = %to, "Order status changed");
        },
    }
}

/// Payment resolution.
#[derive(Clone, Debug)]
pub struct PaymentGate {
    env: CanteenEnvironment,
}

impl PaymentGate {
    /// Creates the payment gate
    #[must_use]
    pub const fn new(env: CanteenEnvironment) -> Self {
        Self { env }
    }

    /// Record the outcome of a payment attempt.
    ///
    /// Success sets `paid` and moves the order to `preparing` in one write.
    /// Failure sets `failed` and leaves the order `pending`. Either way the
    /// order's payment is settled for good: concurrent or repeated calls get
    /// exactly one success between them.
    ///
    /// # Errors
    ///
    /// - [`CanteenError::NotFound`] if there is no such order
    /// - [`CanteenError::InvalidState`] if a payment outcome was already
    ///   recorded, or the order was cancelled
    pub async fn resolve(
        &self,
        order_id: &OrderId,
        method: PaymentMethod,
        outcome: PaymentOutcome,
    ) -> Result<Order, CanteenError> {
        let repository = &self.env.repository;
        let order_env = &self.env.order_environment();
        let outcome_ref = &outcome;

        let (order, events) = retry_on_conflict(&self.env.config, "payment", move || async move {
            let Versioned { value: mut order, version } = repository
                .load_order(order_id)
                .await?
                .ok_or_else(|| CanteenError::order_not_found(order_id))?;

            let action = PaymentAction::Resolve {
                method,
                outcome: outcome_ref.clone(),
            };
            let events = PaymentReducer.reduce(&mut order, action, order_env).inspect_err(|err| {
                tracing::warn!(order_id = %order_id, error = %err, "Payment rejected");
            })?;
            order.check_consistency()?;

            repository.save_order(&order, version).await?;
            Ok::<_, Attempt>((order, events))
        })
        .await?;

        PaymentMetrics::record(&outcome);
        for event in &events {
            record_order_event(event);
        }
        Ok(order)
    }
}
