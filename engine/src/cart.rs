//! Cart engine: per-user baskets priced live against the catalog.

use crate::environment::CanteenEnvironment;
use crate::metrics::CartMetrics;
use crate::retry::{Attempt, retry_on_conflict};
use canteen_core::cart::{Cart, CartAction, CartEnvironment, CartEvent, CartLine, CartReducer, CartSnapshot};
use canteen_core::catalog::{Catalog, CatalogError, CatalogItem};
use canteen_core::error::CanteenError;
use canteen_core::reducer::Reducer;
use canteen_core::repository::{Repository, Versioned};
use canteen_core::types::{ItemId, UserId};
use std::collections::HashMap;

/// Look up every distinct item in `ids`.
///
/// Unknown ids are left out when `skip_missing` is set; the caller decides
/// whether a gap is an error.
async fn lookup_items(
    catalog: &dyn Catalog,
    ids: impl IntoIterator<Item = ItemId>,
    skip_missing: bool,
) -> Result<HashMap<ItemId, CatalogItem>, CanteenError> {
    let mut items = HashMap::new();
    for id in ids {
        if items.contains_key(&id) {
            continue;
        }
        match catalog.get_item(&id).await {
            Ok(item) => {
                items.insert(id, item);
            },
            Err(CatalogError::NotFound(_)) if skip_missing => {},
            Err(err) => {
                if matches!(err, CatalogError::Unavailable(_)) {
                    tracing::error!(item_id = %id, error = %err, "Catalog lookup failed");
                }
                return Err(err.into());
            },
        }
    }
    Ok(items)
}

/// Price a cart against the catalog's current prices.
///
/// # Errors
///
/// [`CanteenError::NotFound`] if a line's item left the catalog,
/// [`CanteenError::DependencyUnavailable`] if the catalog is down.
pub(crate) async fn price_cart(catalog: &dyn Catalog, cart: &Cart) -> Result<CartSnapshot, CanteenError> {
    let ids: Vec<ItemId> = cart.lines().iter().map(|l| l.item_id.clone()).collect();
    let items = lookup_items(catalog, ids, false).await?;
    CartSnapshot::price(cart, &items)
}

fn log_event(user_id: &UserId, event: &CartEvent) {
    match event {
        CartEvent::LineAdded { item_id, quantity } => {
            tracing::info!(user_id = %user_id, item_id = %item_id, quantity, "Cart line added");
        },
        CartEvent::QuantityChanged { item_id, from, to } => {
            tracing::info!(user_id = %user_id, item_id = %item_id, from, to, "Cart quantity changed");
        },
        CartEvent::LineRemoved { item_id } => {
            tracing::info!(user_id = %user_id, item_id = %item_id, "Cart line removed");
        },
        CartEvent::Cleared { lines } => {
            tracing::info!(user_id = %user_id, lines, "Cart cleared");
        },
    }
}

/// Cart operations for any user.
///
/// Every mutation prices the changed cart before storing it and returns that
/// snapshot. A change that cannot be priced is not stored.
#[derive(Clone, Debug)]
pub struct CartEngine {
    env: CanteenEnvironment,
}

impl CartEngine {
    /// Creates the cart engine
    #[must_use]
    pub const fn new(env: CanteenEnvironment) -> Self {
        Self { env }
    }

    /// Add one unit of `item_id`, inserting a line if needed.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] for an unknown item,
    /// [`CanteenError::ItemUnavailable`] if it cannot be ordered right now.
    pub async fn add_item(&self, user_id: &UserId, item_id: &ItemId) -> Result<CartSnapshot, CanteenError> {
        self.apply(
            user_id,
            CartAction::AddItem {
                item_id: item_id.clone(),
            },
        )
        .await
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// As [`CartEngine::add_item`] when the quantity goes up.
    pub async fn set_quantity(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: i64,
    ) -> Result<CartSnapshot, CanteenError> {
        self.apply(
            user_id,
            CartAction::SetQuantity {
                item_id: item_id.clone(),
                quantity,
            },
        )
        .await
    }

    /// Remove a line. Removing an absent item changes nothing.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn remove_item(&self, user_id: &UserId, item_id: &ItemId) -> Result<CartSnapshot, CanteenError> {
        self.apply(
            user_id,
            CartAction::RemoveItem {
                item_id: item_id.clone(),
            },
        )
        .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Only dependency failures.
    pub async fn clear(&self, user_id: &UserId) -> Result<CartSnapshot, CanteenError> {
        self.apply(user_id, CartAction::Clear).await
    }

    /// Merge `lines` into the cart, all or nothing.
    ///
    /// # Errors
    ///
    /// The first line whose item is unknown or unavailable fails the whole call.
    pub async fn add_lines(&self, user_id: &UserId, lines: Vec<CartLine>) -> Result<CartSnapshot, CanteenError> {
        self.apply(user_id, CartAction::AddLines { lines }).await
    }

    /// Current lines with live prices and computed totals.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] if a line's item left the catalog.
    pub async fn snapshot(&self, user_id: &UserId) -> Result<CartSnapshot, CanteenError> {
        let cart = self.env.repository.load_cart(user_id).await?;
        price_cart(self.env.catalog.as_ref(), &cart.value).await
    }

    async fn apply(&self, user_id: &UserId, action: CartAction) -> Result<CartSnapshot, CanteenError> {
        let catalog = self.env.catalog.as_ref();
        let lookups = lookup_items(catalog, action.items_to_check(), true).await?;
        let cart_env = CartEnvironment::new(lookups.values().cloned());

        let repository = &self.env.repository;
        let action = &action;
        let cart_env = &cart_env;
        let lookups = &lookups;

        retry_on_conflict(&self.env.config, "cart update", move || async move {
            let Versioned { value: mut cart, version } = repository.load_cart(user_id).await?;

            let events = CartReducer
                .reduce(&mut cart, action.clone(), cart_env)
                .inspect_err(|err| {
                    tracing::warn!(user_id = %user_id, error = %err, "Cart change rejected");
                })?;

            // Price the reduced cart before it is written: a line that can no
            // longer be priced fails the call with nothing stored.
            let mut items = lookups.clone();
            let missing = cart
                .lines()
                .iter()
                .map(|l| l.item_id.clone())
                .filter(|id| !lookups.contains_key(id))
                .collect::<Vec<ItemId>>();
            items.extend(lookup_items(catalog, missing, false).await?);
            let snapshot = CartSnapshot::price(&cart, &items).inspect_err(|err| {
                tracing::warn!(user_id = %user_id, error = %err, "Cart change rejected");
            })?;

            if events.is_empty() {
                return Ok(snapshot);
            }

            repository.save_cart(&cart, version).await?;
            CartMetrics::record_mutation();
            for event in &events {
                log_event(user_id, event);
            }
            Ok::<_, Attempt>(snapshot)
        })
        .await
    }
}
