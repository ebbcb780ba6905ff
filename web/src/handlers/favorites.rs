//! Favorites endpoints, on the caller's own favorites.
//!
//! - GET /api/v1/favorites - Favorite items still on the menu
//! - GET /api/v1/favorites/:item_id - Whether an item is a favorite
//! - PUT /api/v1/favorites/:item_id - Add a favorite
//! - DELETE /api/v1/favorites/:item_id - Remove a favorite

use crate::error::AppError;
use crate::extractors::AuthenticatedCaller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use canteen_core::catalog::CatalogItem;
use canteen_core::types::ItemId;
use serde::{Deserialize, Serialize};

/// Whether an item is among the caller's favorites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteStatus {
    /// The item asked about
    pub item_id: ItemId,
    /// Whether it is a favorite
    pub favorite: bool,
}

/// The caller's favorites.
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    Ok(Json(state.canteen.list_favorites(&caller).await?))
}

/// Whether `item_id` is a favorite.
pub async fn is_favorite(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(item_id): Path<ItemId>,
) -> Result<Json<FavoriteStatus>, AppError> {
    let favorite = state.canteen.is_favorite(&caller, &item_id).await?;
    Ok(Json(FavoriteStatus { item_id, favorite }))
}

/// Add a favorite. Adding twice is fine.
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(item_id): Path<ItemId>,
) -> Result<StatusCode, AppError> {
    state.canteen.add_favorite(&caller, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a favorite.
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(item_id): Path<ItemId>,
) -> Result<StatusCode, AppError> {
    state.canteen.remove_favorite(&caller, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
