//! Cart endpoints. Every call works on the caller's own cart.
//!
//! - GET /api/v1/cart - Priced snapshot
//! - DELETE /api/v1/cart - Empty the cart
//! - POST /api/v1/cart/items - Add one unit of an item
//! - PUT /api/v1/cart/items/:item_id - Set a line's quantity (zero or less removes it)
//! - DELETE /api/v1/cart/items/:item_id - Remove a line

use crate::error::AppError;
use crate::extractors::{AuthenticatedCaller, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use canteen_core::cart::CartSnapshot;
use canteen_core::types::ItemId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request Types
// ============================================================================

/// Request to add an item to the cart.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddItemRequest {
    /// Catalog item to add
    pub item_id: ItemId,
}

/// Request to set a line's quantity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetQuantityRequest {
    /// New quantity. Zero or less removes the line.
    pub quantity: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// The caller's cart, priced at current catalog prices.
pub async fn get_cart(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<CartSnapshot>, AppError> {
    Ok(Json(state.canteen.cart(&caller).await?))
}

/// Remove every line from the caller's cart.
pub async fn clear_cart(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<CartSnapshot>, AppError> {
    Ok(Json(state.canteen.clear_cart(&caller).await?))
}

/// Add one unit of an item.
///
/// ```bash
/// curl -X POST http://localhost:3000/api/v1/cart/items \
///   -H "Authorization: Bearer customer-token" \
///   -H "Content-Type: application/json" \
///   -d '{"item_id": "1"}'
/// ```
pub async fn add_item(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartSnapshot>, AppError> {
    tracing::debug!(
        correlation_id = %correlation_id.0,
        user_id = %caller.user_id,
        item_id = %request.item_id,
        "Adding item to cart"
    );
    Ok(Json(state.canteen.add_item(&caller, &request.item_id).await?))
}

/// Set the quantity of a line.
pub async fn set_quantity(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(item_id): Path<ItemId>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<CartSnapshot>, AppError> {
    let snapshot = state
        .canteen
        .set_quantity(&caller, &item_id, request.quantity)
        .await?;
    Ok(Json(snapshot))
}

/// Remove a line. Removing an absent line is a no-op.
pub async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(item_id): Path<ItemId>,
) -> Result<Json<CartSnapshot>, AppError> {
    Ok(Json(state.canteen.remove_item(&caller, &item_id).await?))
}
