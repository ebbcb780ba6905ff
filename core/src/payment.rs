//! Payment gate rules.
//!
//! Payment is modelled as a binary outcome signal, not a gateway protocol.
//! Resolution is one-shot per order: once `paid` or `failed` is recorded,
//! every further attempt is rejected with `InvalidState`.

use crate::error::CanteenError;
use crate::order::{Order, OrderEnvironment, OrderEvent, OrderStatus, PaymentStatus};
use crate::reducer::{Events, Reducer};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::fmt;

/// How the customer paid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Credit or debit card
    #[serde(alias = "credit-card")]
    Card,
    /// Cash at the counter
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::Cash => write!(f, "cash"),
        }
    }
}

/// Result reported for a payment attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PaymentOutcome {
    /// Funds captured
    Success,
    /// Declined
    Failure {
        /// Why it was declined
        reason: String,
    },
}

/// Payment commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentAction {
    /// Record the outcome of a payment attempt.
    Resolve {
        /// Method used
        method: PaymentMethod,
        /// What happened
        outcome: PaymentOutcome,
    },
}

/// Reducer for payment resolution.
///
/// On success, `payment_status = paid` and `status = preparing` are applied
/// together: the order only shows up in the staff queue once both hold. This
/// pending → preparing move is system-driven and bypasses the staff-only rule
/// of the fulfillment reducer.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaymentReducer;

impl Reducer for PaymentReducer {
    type State = Order;
    type Action = PaymentAction;
    type Event = OrderEvent;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        order: &mut Order,
        action: PaymentAction,
        env: &OrderEnvironment,
    ) -> Result<Events<OrderEvent>, CanteenError> {
        let PaymentAction::Resolve { method, outcome } = action;

        if order.payment_status != PaymentStatus::Pending {
            return Err(CanteenError::InvalidState(format!(
                "payment for order {} is already {}",
                order.id(),
                order.payment_status
            )));
        }
        if order.status != OrderStatus::Pending {
            return Err(CanteenError::InvalidState(format!(
                "order {} is {} and can no longer be paid",
                order.id(),
                order.status
            )));
        }

        let at = env.clock.now();
        match outcome {
            PaymentOutcome::Success => {
                order.payment_status = PaymentStatus::Paid;
                order.status = OrderStatus::Preparing;
                order.payment_method = Some(method);
                Ok(smallvec![
                    OrderEvent::PaymentCaptured {
                        order_id: order.id().clone(),
                        method,
                        at,
                    },
                    OrderEvent::StatusChanged {
                        order_id: order.id().clone(),
                        from: OrderStatus::Pending,
                        to: OrderStatus::Preparing,
                        at,
                    },
                ])
            },
            PaymentOutcome::Failure { reason } => {
                order.payment_status = PaymentStatus::Failed;
                order.payment_method = Some(method);
                Ok(smallvec![OrderEvent::PaymentDeclined {
                    order_id: order.id().clone(),
                    method,
                    reason,
                    at,
                }])
            },
        }
    }
}
