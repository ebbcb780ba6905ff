//! Storage boundary for carts, orders and favorites.
//!
//! The engine is storage-agnostic: it only needs get/put/list by key plus
//! compare-and-swap on a record version. Concurrency control is optimistic.
//! Every save names the version it read, and the store refuses the write if
//! someone else got there first.
//!
//! # Implementations
//!
//! - `InMemoryRepository` (in `canteen-testing`): fast, deterministic, used by tests and the demo server
//! - `PostgresRepository` (in `canteen-postgres`): durable production store

use crate::cart::Cart;
use crate::order::Order;
use crate::types::{ItemId, OrderId, PickupCode, UserId};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Record version for optimistic concurrency control.
///
/// A record that was never stored is at [`Version::INITIAL`]. Each successful
/// save moves it to [`Version::next`].
///
/// # Examples
///
/// ```
/// use canteen_core::repository::Version;
///
/// let v0 = Version::INITIAL;
/// assert_eq!(v0.next(), Version::new(1));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of a record that has never been saved.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A record together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The record
    pub value: T,
    /// Version it was read at
    pub version: Version,
}

impl<T> Versioned<T> {
    /// Pairs a value with its version.
    pub const fn new(value: T, version: Version) -> Self {
        Self { value, version }
    }
}

/// Errors that can occur during repository operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Optimistic concurrency conflict: expected version doesn't match current version.
    #[error("Concurrency conflict on {key}: expected {expected}, found {actual}")]
    Conflict {
        /// Record key, e.g. `cart/u-1`
        key: String,
        /// Version the writer read
        expected: Version,
        /// Version currently stored
        actual: Version,
    },

    /// An order with this id already exists.
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderId),

    /// Another order already uses this pickup code.
    #[error("Pickup code {0} already in use")]
    DuplicatePickupCode(PickupCode),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result alias for repository calls.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage capability used by the engine.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine shares one instance
/// across every request.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the engine can hold an `Arc<dyn Repository>`.
pub trait Repository: Send + Sync {
    /// Load a user's cart. An unknown user gets an empty cart at [`Version::INITIAL`].
    ///
    /// # Errors
    ///
    /// Backend or serialization failures.
    fn load_cart<'a>(&'a self, user_id: &'a UserId) -> BoxFuture<'a, RepositoryResult<Versioned<Cart>>>;

    /// Store a cart if it is still at `expected`. Returns the new version.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] if the stored version moved.
    fn save_cart<'a>(
        &'a self,
        cart: &'a Cart,
        expected: Version,
    ) -> BoxFuture<'a, RepositoryResult<Version>>;

    /// Insert `order` and empty its owner's cart in one atomic step, provided
    /// the cart is still at `cart_version`. Either both happen or neither does.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] if the cart moved,
    /// [`RepositoryError::DuplicateOrder`] / [`RepositoryError::DuplicatePickupCode`]
    /// on an id collision.
    fn commit_checkout<'a>(
        &'a self,
        order: &'a Order,
        cart_version: Version,
    ) -> BoxFuture<'a, RepositoryResult<()>>;

    /// Load an order with its version, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Backend or serialization failures.
    fn load_order<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, RepositoryResult<Option<Versioned<Order>>>>;

    /// Replace an existing order if it is still at `expected`. Returns the new version.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] if the stored version moved.
    fn save_order<'a>(
        &'a self,
        order: &'a Order,
        expected: Version,
    ) -> BoxFuture<'a, RepositoryResult<Version>>;

    /// List orders, all of them or one user's, in insertion order.
    ///
    /// # Errors
    ///
    /// Backend or serialization failures.
    fn list_orders<'a>(
        &'a self,
        user_id: Option<&'a UserId>,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Order>>>;

    /// Mark an item as a favorite. Returns `false` if it already was.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn add_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, RepositoryResult<bool>>;

    /// Unmark a favorite. Returns `false` if it was not marked.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn remove_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, RepositoryResult<bool>>;

    /// A user's favorites in the order they were added.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn list_favorites<'a>(&'a self, user_id: &'a UserId) -> BoxFuture<'a, RepositoryResult<Vec<ItemId>>>;
}
