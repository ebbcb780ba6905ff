//! Order endpoints.
//!
//! - POST /api/v1/checkout - Turn the caller's cart into an order
//! - GET /api/v1/orders - The caller's orders, newest first
//! - GET /api/v1/orders/:id - One order (owner or staff)
//! - POST /api/v1/orders/:id/payment - Record a payment outcome (owner or staff)
//! - POST /api/v1/orders/:id/reorder - Copy an order's items into the cart
//! - POST /api/v1/orders/:id/status - Move an order along (staff)

use crate::error::AppError;
use crate::extractors::{AuthenticatedCaller, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use canteen_core::cart::CartSnapshot;
use canteen_core::money::Money;
use canteen_core::order::{Order, OrderLine, OrderStatus, PaymentStatus};
use canteen_core::payment::{PaymentMethod, PaymentOutcome};
use canteen_core::types::{OrderId, PickupCode, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Order as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Order ID
    pub id: OrderId,
    /// Owner
    pub user_id: UserId,
    /// Lines frozen at checkout
    pub lines: Vec<OrderLine>,
    /// Total in cents
    pub total_amount: Money,
    /// Fulfillment status
    pub status: OrderStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Method of the recorded payment outcome, if any
    pub payment_method: Option<PaymentMethod>,
    /// Checkout time
    pub created_at: DateTime<Utc>,
    /// Longest prep time among the items
    pub prep_time_minutes: u32,
    /// `created_at + prep_time_minutes`
    pub estimated_ready_at: DateTime<Utc>,
    /// Code shown at the counter
    pub pickup_code: PickupCode,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().clone(),
            user_id: order.user_id().clone(),
            lines: order.lines().to_vec(),
            total_amount: order.total_amount(),
            status: order.status(),
            payment_status: order.payment_status(),
            payment_method: order.payment_method(),
            created_at: order.created_at(),
            prep_time_minutes: order.prep_time_minutes(),
            estimated_ready_at: order.estimated_ready_at(),
            pickup_code: order.pickup_code().clone(),
        }
    }
}

/// Map a list of orders for the wire.
pub(crate) fn order_list(orders: &[Order]) -> Vec<OrderResponse> {
    orders.iter().map(OrderResponse::from).collect()
}

/// Query parameters for order listings.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    /// Only orders in this status
    pub status: Option<OrderStatus>,
}

/// Outcome reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Funds captured
    Success,
    /// Declined
    Failure,
}

/// Request to record a payment outcome.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentRequest {
    /// `card` (or `credit-card`) or `cash`
    pub method: PaymentMethod,
    /// `success` or `failure`
    pub outcome: OutcomeKind,
    /// Decline reason, for failures
    #[serde(default)]
    pub reason: Option<String>,
}

impl PaymentRequest {
    fn into_outcome(self) -> PaymentOutcome {
        match self.outcome {
            OutcomeKind::Success => PaymentOutcome::Success,
            OutcomeKind::Failure => PaymentOutcome::Failure {
                reason: self
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "declined".to_string()),
            },
        }
    }
}

/// Request to change an order's status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusRequest {
    /// Target status
    pub status: OrderStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// Check out the caller's cart.
///
/// ```bash
/// curl -X POST http://localhost:3000/api/v1/checkout \
///   -H "Authorization: Bearer customer-token"
/// ```
pub async fn checkout(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state.canteen.checkout(&caller).await?;
    tracing::debug!(
        correlation_id = %correlation_id.0,
        order_id = %order.id(),
        "Checkout handled"
    );
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// The caller's orders, newest first.
pub async fn list_my_orders(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.canteen.list_my_orders(&caller, query.status).await?;
    Ok(Json(order_list(&orders)))
}

/// One order.
pub async fn get_order(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.canteen.get_order(&caller, &order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// Record the payment outcome for an order.
///
/// ```bash
/// curl -X POST http://localhost:3000/api/v1/orders/<id>/payment \
///   -H "Authorization: Bearer customer-token" \
///   -H "Content-Type: application/json" \
///   -d '{"method": "card", "outcome": "success"}'
/// ```
pub async fn resolve_payment(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(order_id): Path<OrderId>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let method = request.method;
    tracing::debug!(
        correlation_id = %correlation_id.0,
        order_id = %order_id,
        method = %method,
        "Payment outcome received"
    );
    let order = state
        .canteen
        .resolve_payment(&caller, &order_id, method, request.into_outcome())
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// Copy a past order's items into the caller's cart.
pub async fn reorder(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(order_id): Path<OrderId>,
) -> Result<Json<CartSnapshot>, AppError> {
    Ok(Json(state.canteen.reorder(&caller, &order_id).await?))
}

/// Move an order to the requested status. Staff only.
pub async fn update_status(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(order_id): Path<OrderId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    tracing::debug!(
        correlation_id = %correlation_id.0,
        order_id = %order_id,
        status = %request.status,
        "Status change requested"
    );
    let order = state
        .canteen
        .advance_order(&caller, &order_id, request.status)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_wire_format() {
        let request: PaymentRequest =
            serde_json::from_str(r#"{"method":"credit-card","outcome":"success"}"#).unwrap();
        assert_eq!(request.method, PaymentMethod::Card);
        assert_eq!(request.into_outcome(), PaymentOutcome::Success);

        let request: PaymentRequest =
            serde_json::from_str(r#"{"method":"cash","outcome":"failure","reason":"insufficient funds"}"#)
                .unwrap();
        assert_eq!(
            request.into_outcome(),
            PaymentOutcome::Failure {
                reason: "insufficient funds".into()
            }
        );
    }

    #[test]
    fn test_failure_without_reason_gets_a_default() {
        let request: PaymentRequest =
            serde_json::from_str(r#"{"method":"card","outcome":"failure"}"#).unwrap();
        assert!(matches!(
            request.into_outcome(),
            PaymentOutcome::Failure { reason } if reason == "declined"
        ));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(serde_json::from_str::<PaymentRequest>(r#"{"method":"bitcoin","outcome":"success"}"#).is_err());
    }
}
