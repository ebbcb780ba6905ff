//! Staff endpoints.
//!
//! - GET /api/v1/staff/orders - Every order, newest first
//! - GET /api/v1/staff/queue - Paid, unfinished orders, oldest first
//! - GET /api/v1/staff/queue/summary - Queue counts per stage

use super::orders::{OrderListQuery, OrderResponse, order_list};
use crate::error::AppError;
use crate::extractors::AuthenticatedCaller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use canteen_engine::QueueSummary;

/// Every order, optionally filtered by status.
pub async fn list_all_orders(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.canteen.list_all_orders(&caller, query.status).await?;
    Ok(Json(order_list(&orders)))
}

/// The kitchen queue.
pub async fn queue(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.canteen.staff_queue(&caller).await?;
    Ok(Json(order_list(&orders)))
}

/// Counts per kitchen stage.
pub async fn queue_summary(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<QueueSummary>, AppError> {
    Ok(Json(state.canteen.queue_summary(&caller).await?))
}
