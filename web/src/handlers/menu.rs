//! Menu endpoint.
//!
//! - GET /api/v1/menu - List the menu, optionally by category or vegetarian only

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use canteen_core::catalog::{CatalogItem, MenuFilter};
use serde::Deserialize;

/// Query parameters for the menu.
#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    /// Only this category (case-insensitive)
    pub category: Option<String>,
    /// Only vegetarian items
    #[serde(default)]
    pub vegetarian: bool,
}

impl From<MenuQuery> for MenuFilter {
    fn from(query: MenuQuery) -> Self {
        Self {
            category: query.category.filter(|c| !c.trim().is_empty()),
            vegetarian_only: query.vegetarian,
        }
    }
}

/// List the menu.
///
/// Public endpoint - no authentication required.
///
/// ```bash
/// curl 'http://localhost:3000/api/v1/menu?category=burgers&vegetarian=true'
/// ```
pub async fn list_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    let items = state.canteen.list_menu(&query.into()).await?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_category_means_no_filter() {
        let filter: MenuFilter = MenuQuery {
            category: Some("  ".into()),
            vegetarian: true,
        }
        .into();
        assert_eq!(filter.category, None);
        assert!(filter.vegetarian_only);
    }
}
