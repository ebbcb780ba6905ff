//! In-memory repository for fast, deterministic tests and the demo server.
//!
//! One `RwLock` guards all tables, so every operation, including
//! [`Repository::commit_checkout`], is atomic.

use canteen_core::cart::Cart;
use canteen_core::order::Order;
use canteen_core::repository::{
    Repository, RepositoryError, RepositoryResult, Version, Versioned,
};
use canteen_core::types::{ItemId, OrderId, PickupCode, UserId};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    carts: HashMap<UserId, Versioned<Cart>>,
    orders: HashMap<OrderId, Versioned<Order>>,
    // Insertion order of `orders`.
    order_log: Vec<OrderId>,
    pickup_codes: HashSet<PickupCode>,
    favorites: HashMap<UserId, Vec<ItemId>>,
}

/// `HashMap`-backed [`Repository`].
///
/// Cheap to clone; clones share the same tables.
///
/// # Example
///
/// ```
/// use canteen_testing::InMemoryRepository;
///
/// let repository = InMemoryRepository::new();
/// assert_eq!(repository.order_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
    offline: Arc<AtomicBool>,
    forced_conflicts: Arc<AtomicUsize>,
}

impl InMemoryRepository {
    /// Create a new empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store being unreachable: every call fails with
    /// [`RepositoryError::Backend`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `n` versioned writes fail with a conflict, as if another
    /// writer got there first.
    pub fn force_conflicts(&self, n: usize) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.read().orders.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(&self) -> RepositoryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RepositoryError::Backend("repository is offline".into()))
        } else {
            Ok(())
        }
    }

    fn take_forced_conflict(&self, key: String, expected: Version) -> RepositoryResult<()> {
        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            Err(RepositoryError::Conflict {
                key,
                expected,
                actual: expected.next(),
            })
        } else {
            Ok(())
        }
    }
}

fn check_version(key: impl FnOnce() -> String, expected: Version, actual: Version) -> RepositoryResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RepositoryError::Conflict {
            key: key(),
            expected,
            actual,
        })
    }
}

impl Repository for InMemoryRepository {
    fn load_cart<'a>(&'a self, user_id: &'a UserId) -> BoxFuture<'a, RepositoryResult<Versioned<Cart>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.read().carts.get(user_id).cloned().unwrap_or_else(|| {
                Versioned::new(Cart::new(user_id.clone()), Version::INITIAL)
            }))
        })
    }

    fn save_cart<'a>(
        &'a self,
        cart: &'a Cart,
        expected: Version,
    ) -> BoxFuture<'a, RepositoryResult<Version>> {
        Box::pin(async move {
            self.check_online()?;
            let key = || format!("cart/{}", cart.user_id());
            self.take_forced_conflict(key(), expected)?;

            let mut tables = self.write();
            let actual = tables
                .carts
                .get(cart.user_id())
                .map_or(Version::INITIAL, |c| c.version);
            check_version(key, expected, actual)?;

            let next = expected.next();
            tables
                .carts
                .insert(cart.user_id().clone(), Versioned::new(cart.clone(), next));
            Ok(next)
        })
    }

    fn commit_checkout<'a>(
        &'a self,
        order: &'a Order,
        cart_version: Version,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            self.check_online()?;
            let user_id = order.user_id();
            let key = || format!("cart/{user_id}");
            self.take_forced_conflict(key(), cart_version)?;

            let mut tables = self.write();
            let actual = tables.carts.get(user_id).map_or(Version::INITIAL, |c| c.version);
            check_version(key, cart_version, actual)?;
            if tables.orders.contains_key(order.id()) {
                return Err(RepositoryError::DuplicateOrder(order.id().clone()));
            }
            if tables.pickup_codes.contains(order.pickup_code()) {
                return Err(RepositoryError::DuplicatePickupCode(order.pickup_code().clone()));
            }

            // All checks passed: nothing below can fail.
            tables.pickup_codes.insert(order.pickup_code().clone());
            tables.order_log.push(order.id().clone());
            tables.orders.insert(
                order.id().clone(),
                Versioned::new(order.clone(), Version::INITIAL.next()),
            );
            tables.carts.insert(
                user_id.clone(),
                Versioned::new(Cart::new(user_id.clone()), cart_version.next()),
            );
            Ok(())
        })
    }

    fn load_order<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, RepositoryResult<Option<Versioned<Order>>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.read().orders.get(order_id).cloned())
        })
    }

    fn save_order<'a>(
        &'a self,
        order: &'a Order,
        expected: Version,
    ) -> BoxFuture<'a, RepositoryResult<Version>> {
        Box::pin(async move {
            self.check_online()?;
            let key = || format!("order/{}", order.id());
            self.take_forced_conflict(key(), expected)?;

            let mut tables = self.write();
            let actual = tables
                .orders
                .get(order.id())
                .map_or(Version::INITIAL, |o| o.version);
            // Orders are only created by `commit_checkout`.
            if actual == Version::INITIAL {
                return Err(RepositoryError::Backend(format!("order {} does not exist", order.id())));
            }
            check_version(key, expected, actual)?;

            let next = expected.next();
            tables
                .orders
                .insert(order.id().clone(), Versioned::new(order.clone(), next));
            Ok(next)
        })
    }

    fn list_orders<'a>(
        &'a self,
        user_id: Option<&'a UserId>,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Order>>> {
        Box::pin(async move {
            self.check_online()?;
            let tables = self.read();
            Ok(tables
                .order_log
                .iter()
                .filter_map(|id| tables.orders.get(id))
                .map(|o| &o.value)
                .filter(|o| user_id.is_none_or(|u| o.user_id() == u))
                .cloned()
                .collect())
        })
    }

    fn add_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, RepositoryResult<bool>> {
        Box::pin(async move {
            self.check_online()?;
            let mut tables = self.write();
            let favorites = tables.favorites.entry(user_id.clone()).or_default();
            if favorites.contains(item_id) {
                return Ok(false);
            }
            favorites.push(item_id.clone());
            Ok(true)
        })
    }

    fn remove_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, RepositoryResult<bool>> {
        Box::pin(async move {
            self.check_online()?;
            let mut tables = self.write();
            let Some(favorites) = tables.favorites.get_mut(user_id) else {
                return Ok(false);
            };
            let before = favorites.len();
            favorites.retain(|f| f != item_id);
            Ok(favorites.len() != before)
        })
    }

    fn list_favorites<'a>(&'a self, user_id: &'a UserId) -> BoxFuture<'a, RepositoryResult<Vec<ItemId>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.read().favorites.get(user_id).cloned().unwrap_or_default())
        })
    }
}
