//! Static catalog and identity providers.
//!
//! Both keep their data behind `Arc<RwLock<_>>` so a test can hold a clone,
//! change prices or availability mid-test, and have the engine see it.

use canteen_core::catalog::{Catalog, CatalogError, CatalogItem};
use canteen_core::identity::{Credential, Identity, IdentityError};
use canteen_core::money::Money;
use canteen_core::types::{Caller, ItemId};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory menu.
///
/// Items are listed in insertion order.
///
/// # Example
///
/// ```
/// use canteen_testing::{fixtures, StaticCatalog};
/// use canteen_core::money::Money;
/// use canteen_core::types::ItemId;
///
/// let catalog = StaticCatalog::new(fixtures::menu());
/// assert!(catalog.set_price(&ItemId::new(fixtures::FRENCH_FRIES), Money::from_cents(450)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    items: Arc<RwLock<Vec<CatalogItem>>>,
    offline: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl StaticCatalog {
    /// Create a catalog serving `items`
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items.into_iter().collect())),
            ..Self::default()
        }
    }

    fn update(&self, id: &ItemId, f: impl FnOnce(&mut CatalogItem)) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.iter_mut().find(|i| &i.id == id).map(f).is_some()
    }

    /// Change an item's price. Returns `false` if the item is unknown.
    pub fn set_price(&self, id: &ItemId, price: Money) -> bool {
        self.update(id, |item| item.unit_price = price)
    }

    /// Toggle an item's availability. Returns `false` if the item is unknown.
    pub fn set_available(&self, id: &ItemId, available: bool) -> bool {
        self.update(id, |item| item.available = available)
    }

    /// Add or replace an item.
    pub fn upsert(&self, item: CatalogItem) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Take an item off the menu entirely.
    pub fn remove(&self, id: &ItemId) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|i| &i.id != id);
        items.len() != before
    }

    /// Simulate the catalog being unreachable: every call fails with
    /// [`CatalogError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get_item` calls served so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), CatalogError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CatalogError::Unavailable("catalog is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl Catalog for StaticCatalog {
    fn get_item<'a>(&'a self, id: &'a ItemId) -> BoxFuture<'a, Result<CatalogItem, CatalogError>> {
        Box::pin(async move {
            self.check_online()?;
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.items
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|i| &i.id == id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.clone()))
        })
    }

    fn list_items(&self) -> BoxFuture<'_, Result<Vec<CatalogItem>, CatalogError>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.items.read().unwrap_or_else(PoisonError::into_inner).clone())
        })
    }
}

/// Bearer-token lookup table.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity {
    tokens: Arc<RwLock<HashMap<String, Caller>>>,
    offline: Arc<AtomicBool>,
}

impl StaticIdentity {
    /// Create a provider that knows the given `(token, caller)` pairs
    #[must_use]
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, Caller)>,
        T: Into<String>,
    {
        Self {
            tokens: Arc::new(RwLock::new(
                tokens.into_iter().map(|(t, c)| (t.into(), c)).collect(),
            )),
            ..Self::default()
        }
    }

    /// Register another token.
    pub fn insert(&self, token: impl Into<String>, caller: Caller) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), caller);
    }

    /// Simulate the provider being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl Identity for StaticIdentity {
    fn resolve_caller<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Caller, IdentityError>> {
        Box::pin(async move {
            if self.offline.load(Ordering::SeqCst) {
                return Err(IdentityError::Unavailable("identity provider is offline".into()));
            }
            self.tokens
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(credential.expose())
                .cloned()
                .ok_or(IdentityError::Unauthenticated)
        })
    }
}
