//! Menu listing and per-user favorites.

use crate::environment::CanteenEnvironment;
use canteen_core::catalog::{Catalog, CatalogError, CatalogItem, MenuFilter};
use canteen_core::error::{CanteenError, Entity};
use canteen_core::repository::Repository;
use canteen_core::types::{ItemId, UserId};

/// Read side of the catalog plus favorites.
#[derive(Clone, Debug)]
pub struct Menu {
    env: CanteenEnvironment,
}

impl Menu {
    /// Creates the menu service
    #[must_use]
    pub const fn new(env: CanteenEnvironment) -> Self {
        Self { env }
    }

    /// Catalog items passing `filter`, in catalog order.
    ///
    /// # Errors
    ///
    /// [`CanteenError::DependencyUnavailable`] if the catalog is down.
    pub async fn list(&self, filter: &MenuFilter) -> Result<Vec<CatalogItem>, CanteenError> {
        let items = self.env.catalog.list_items().await.inspect_err(|err| {
            tracing::error!(error = %err, "Menu listing failed");
        })?;
        Ok(items.into_iter().filter(|item| filter.matches(item)).collect())
    }

    /// One catalog item.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] for an unknown id.
    pub async fn item(&self, item_id: &ItemId) -> Result<CatalogItem, CanteenError> {
        Ok(self.env.catalog.get_item(item_id).await?)
    }

    /// Mark `item_id` as one of the user's favorites. Already a favorite is fine.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] if the catalog does not know the item.
    pub async fn add_favorite(&self, user_id: &UserId, item_id: &ItemId) -> Result<(), CanteenError> {
        self.item(item_id).await?;
        if self.env.repository.add_favorite(user_id, item_id).await? {
            tracing::info!(user_id = %user_id, item_id = %item_id, "Favorite added");
        }
        Ok(())
    }

    /// Unmark a favorite.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] if the item was not a favorite.
    pub async fn remove_favorite(&self, user_id: &UserId, item_id: &ItemId) -> Result<(), CanteenError> {
        if !self.env.repository.remove_favorite(user_id, item_id).await? {
            return Err(CanteenError::NotFound {
                entity: Entity::Favorite,
                id: item_id.to_string(),
            });
        }
        tracing::info!(user_id = %user_id, item_id = %item_id, "Favorite removed");
        Ok(())
    }

    /// The user's favorites as current catalog entries, in the order they
    /// were added. Items that left the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn list_favorites(&self, user_id: &UserId) -> Result<Vec<CatalogItem>, CanteenError> {
        let ids = self.env.repository.list_favorites(user_id).await?;
        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.env.catalog.get_item(id).await {
                Ok(item) => items.push(item),
                Err(CatalogError::NotFound(_)) => {
                    tracing::debug!(user_id = %user_id, item_id = %id, "Favorite no longer on the menu");
                },
                Err(err) => return Err(err.into()),
            }
        }
        Ok(items)
    }

    /// Whether `item_id` is one of the user's favorites.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn is_favorite(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool, CanteenError> {
        let ids = self.env.repository.list_favorites(user_id).await?;
        Ok(ids.contains(item_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use canteen_core::types::Caller;
    use canteen_testing::{InMemoryRepository, StaticCatalog, StaticIdentity, fixtures};
    use std::sync::Arc;

    fn menu_with(catalog: &StaticCatalog) -> Menu {
        Menu::new(CanteenEnvironment::new(
            Arc::new(catalog.clone()),
            Arc::new(StaticIdentity::new([("t", Caller::customer("u"))])),
            Arc::new(InMemoryRepository::new()),
        ))
    }

    #[tokio::test]
    async fn filters_by_category_and_diet() {
        let menu = menu_with(&StaticCatalog::new(fixtures::menu()));

        let burgers = menu
            .list(&MenuFilter {
                category: Some("Burgers".into()),
                vegetarian_only: false,
            })
            .await
            .unwrap();
        assert_eq!(burgers.len(), 2);

        let veggie = menu
            .list(&MenuFilter {
                category: None,
                vegetarian_only: true,
            })
            .await
            .unwrap();
        assert!(veggie.iter().all(|i| i.is_vegetarian));
        assert_eq!(veggie.len(), 5);
    }

    #[tokio::test]
    async fn favorites_skip_items_that_left_the_menu() {
        let catalog = StaticCatalog::new(fixtures::menu());
        let menu = menu_with(&catalog);
        let user = UserId::new("u");

        menu.add_favorite(&user, &ItemId::new(fixtures::VEGGIE_BURGER)).await.unwrap();
        menu.add_favorite(&user, &ItemId::new(fixtures::FRENCH_FRIES)).await.unwrap();
        assert!(catalog.remove(&ItemId::new(fixtures::VEGGIE_BURGER)));

        let favorites = menu.list_favorites(&user).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id.as_str(), fixtures::FRENCH_FRIES);
    }

    #[tokio::test]
    async fn removing_an_absent_favorite_is_not_found() {
        let menu = menu_with(&StaticCatalog::new(fixtures::menu()));
        let err = menu
            .remove_favorite(&UserId::new("u"), &ItemId::new(fixtures::VEGGIE_BURGER))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CanteenError::NotFound {
                entity: Entity::Favorite,
                ..
            }
        ));
    }
}
