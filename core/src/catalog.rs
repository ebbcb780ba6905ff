//! Menu catalog collaborator.
//!
//! The catalog is read-only from the engine's point of view. Carts read live
//! prices from it; orders copy the price at checkout and never look again.

use crate::money::Money;
use crate::types::ItemId;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A menu item as reported by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Item identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Menu category (e.g. "burgers")
    pub category: String,
    /// Current price per unit. Never negative.
    pub unit_price: Money,
    /// Whether the kitchen currently accepts orders for it
    pub available: bool,
    /// Minutes the kitchen needs to prepare it
    pub prep_time_minutes: u32,
    /// Vegetarian flag
    pub is_vegetarian: bool,
}

/// Errors from a catalog lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No item with this id.
    #[error("Catalog item {0} not found")]
    NotFound(ItemId),

    /// The catalog could not be reached.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Narrowing applied when listing the menu.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuFilter {
    /// Only this category.
    pub category: Option<String>,
    /// Only vegetarian items.
    #[serde(default)]
    pub vegetarian_only: bool,
}

impl MenuFilter {
    /// Whether an item passes the filter.
    #[must_use]
    pub fn matches(&self, item: &CatalogItem) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|c| item.category.eq_ignore_ascii_case(c));
        category_ok && (!self.vegetarian_only || item.is_vegetarian)
    }
}

/// Catalog lookup capability.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the engine can hold an `Arc<dyn Catalog>`.
pub trait Catalog: Send + Sync {
    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for an unknown id, [`CatalogError::Unavailable`]
    /// if the catalog cannot be reached.
    fn get_item<'a>(&'a self, id: &'a ItemId) -> BoxFuture<'a, Result<CatalogItem, CatalogError>>;

    /// List every item on the menu.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Unavailable`] if the catalog cannot be reached.
    fn list_items(&self) -> BoxFuture<'_, Result<Vec<CatalogItem>, CatalogError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: &str, veg: bool) -> CatalogItem {
        CatalogItem {
            id: ItemId::new("1"),
            name: "Thing".into(),
            category: category.into(),
            unit_price: Money::from_cents(100),
            available: true,
            prep_time_minutes: 5,
            is_vegetarian: veg,
        }
    }

    #[test]
    fn menu_filter_matches_category_case_insensitively() {
        let filter = MenuFilter {
            category: Some("Pizza".into()),
            vegetarian_only: false,
        };
        assert!(filter.matches(&item("pizza", false)));
        assert!(!filter.matches(&item("burgers", true)));
    }

    #[test]
    fn menu_filter_vegetarian_only() {
        let filter = MenuFilter {
            category: None,
            vegetarian_only: true,
        };
        assert!(filter.matches(&item("sides", true)));
        assert!(!filter.matches(&item("sides", false)));
        assert!(MenuFilter::default().matches(&item("sides", false)));
    }
}
