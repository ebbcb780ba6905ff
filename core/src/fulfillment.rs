//! Fulfillment state machine.
//!
//! ```text
//! pending --(payment success)--> preparing --(staff)--> ready --(staff)--> completed
//! pending   --(staff cancel)--> cancelled
//! preparing --(staff cancel)--> cancelled
//! ```
//!
//! `ready`, `completed` and `cancelled` cannot be cancelled. The
//! pending → preparing edge belongs to the payment gate, so callers can never
//! request it here.

use crate::error::CanteenError;
use crate::order::{Order, OrderEnvironment, OrderEvent, OrderStatus};
use crate::reducer::{Events, Reducer};
use crate::types::Role;
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

/// Who can trigger an edge of the status graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Driven by the payment gate, never by a caller
    System,
    /// Staff member action
    Staff,
}

/// The edge `from → to`, if the graph has one.
#[must_use]
pub const fn edge(from: OrderStatus, to: OrderStatus) -> Option<Trigger> {
    use OrderStatus::{Cancelled, Completed, Pending, Preparing, Ready};
    match (from, to) {
        (Pending, Preparing) => Some(Trigger::System),
        (Preparing, Ready) | (Ready, Completed) | (Pending | Preparing, Cancelled) => {
            Some(Trigger::Staff)
        },
        _ => None,
    }
}

/// Direct successors of `from` a staff member may request.
#[must_use]
pub fn staff_successors(from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|to| edge(from, *to) == Some(Trigger::Staff))
        .collect()
}

/// Fulfillment commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentAction {
    /// Move the order to `target`.
    Advance {
        /// Requested status
        target: OrderStatus,
        /// Role of the caller requesting it
        actor: Role,
    },
}

/// Reducer enforcing the status graph and who may walk it.
#[derive(Clone, Copy, Debug, Default)]
pub struct FulfillmentReducer;

impl Reducer for FulfillmentReducer {
    type State = Order;
    type Action = FulfillmentAction;
    type Event = OrderEvent;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        order: &mut Order,
        action: FulfillmentAction,
        env: &OrderEnvironment,
    ) -> Result<Events<OrderEvent>, CanteenError> {
        let FulfillmentAction::Advance { target, actor } = action;

        if actor != Role::Staff {
            return Err(CanteenError::Forbidden(format!(
                "only staff may move orders to {target}"
            )));
        }

        let from = order.status;
        match edge(from, target) {
            Some(Trigger::Staff) => {},
            Some(Trigger::System) | None => {
                return Err(CanteenError::IllegalTransition { from, to: target });
            },
        }

        order.status = target;
        Ok(smallvec![OrderEvent::StatusChanged {
            order_id: order.id().clone(),
            from,
            to: target,
            at: env.clock.now(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::{Cancelled, Completed, Pending, Preparing, Ready};

    #[test]
    fn graph_edges() {
        assert_eq!(edge(Pending, Preparing), Some(Trigger::System));
        assert_eq!(edge(Preparing, Ready), Some(Trigger::Staff));
        assert_eq!(edge(Ready, Completed), Some(Trigger::Staff));
        assert_eq!(edge(Pending, Cancelled), Some(Trigger::Staff));
        assert_eq!(edge(Preparing, Cancelled), Some(Trigger::Staff));
    }

    #[test]
    fn no_skipping_backtracking_or_leaving_terminal_states() {
        assert_eq!(edge(Pending, Completed), None);
        assert_eq!(edge(Pending, Ready), None);
        assert_eq!(edge(Ready, Preparing), None);
        assert_eq!(edge(Ready, Cancelled), None);
        for to in OrderStatus::ALL {
            assert_eq!(edge(Completed, to), None);
            assert_eq!(edge(Cancelled, to), None);
            assert_eq!(edge(to, to), None);
        }
    }

    #[test]
    fn staff_successor_lists() {
        assert_eq!(staff_successors(Pending), vec![Cancelled]);
        assert_eq!(staff_successors(Preparing), vec![Ready, Cancelled]);
        assert_eq!(staff_successors(Ready), vec![Completed]);
        assert!(staff_successors(Completed).is_empty());
    }
}
