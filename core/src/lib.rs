//! # Canteen Core
//!
//! Domain types, reducers and collaborator traits for the canteen ordering engine.
//!
//! This crate holds the functional core of the system: how a cart accumulates
//! items, how a cart snapshot becomes an immutable priced order, how a payment
//! outcome gates an order, and how an order moves through fulfillment. It does
//! no I/O. Storage, the menu catalog and caller identity are injected through
//! traits and driven by `canteen-engine`.
//!
//! ## Core Concepts
//!
//! - **State**: a `Cart` or an `Order`
//! - **Action**: an intent against that state (`CartAction`, `PaymentAction`, `FulfillmentAction`)
//! - **Reducer**: validates an action, mutates state, returns the events that happened
//! - **Event**: a fact about what happened (`CartEvent`, `OrderEvent`)
//! - **Environment**: injected dependencies (`Clock`, `IdGenerator`)
//!
//! ## Reducer contract
//!
//! A reducer validates the whole action before touching state. If it returns
//! `Err`, the state is exactly as it was. That is what makes every multi-field
//! update all-or-nothing.
//!
//! ## Example
//!
//! ```
//! use canteen_core::cart::{Cart, CartAction, CartEnvironment, CartReducer};
//! use canteen_core::catalog::CatalogItem;
//! use canteen_core::money::Money;
//! use canteen_core::reducer::Reducer;
//! use canteen_core::types::{ItemId, UserId};
//!
//! let burger = ItemId::new("1");
//! let env = CartEnvironment::new([CatalogItem {
//!     id: burger.clone(),
//!     name: "Veggie Burger".into(),
//!     category: "burgers".into(),
//!     unit_price: Money::from_cents(799),
//!     available: true,
//!     prep_time_minutes: 10,
//!     is_vegetarian: true,
//! }]);
//! let mut cart = Cart::new(UserId::new("u-1"));
//!
//! CartReducer.reduce(&mut cart, CartAction::AddItem { item_id: burger.clone() }, &env)?;
//! CartReducer.reduce(&mut cart, CartAction::AddItem { item_id: burger.clone() }, &env)?;
//!
//! assert_eq!(cart.quantity_of(&burger), 2);
//! assert_eq!(cart.item_count(), 2);
//! # Ok::<(), canteen_core::error::CanteenError>(())
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use futures::future::BoxFuture;
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod cart;
pub mod catalog;
pub mod error;
pub mod fulfillment;
pub mod identity;
pub mod money;
pub mod order;
pub mod payment;
pub mod repository;
pub mod types;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Result<Events>`
///
/// They contain all business rules and are deterministic and testable.
pub mod reducer {
    use crate::error::CanteenError;
    use smallvec::SmallVec;

    /// Events emitted by a single reduction.
    pub type Events<E> = SmallVec<[E; 4]>;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Event`: The facts this reducer reports after applying an action
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CartReducer {
    ///     type State = Cart;
    ///     type Action = CartAction;
    ///     type Event = CartEvent;
    ///     type Environment = CartEnvironment;
    ///
    ///     fn reduce(&self, cart: &mut Cart, action: CartAction, env: &CartEnvironment)
    ///         -> Result<Events<CartEvent>, CanteenError>
    ///     {
    ///         match action {
    ///             CartAction::Clear => { /* ... */ }
    ///             // ...
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The event type this reducer emits
        type Event;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and events
        ///
        /// 1. Validates the action against current state
        /// 2. Updates state in place
        /// 3. Returns the events describing the change
        ///
        /// An empty event list means the action was a valid no-op.
        ///
        /// # Errors
        ///
        /// Returns a [`CanteenError`] when the action is not valid for the
        /// current state. The state is left untouched in that case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Events<Self::Event>, CanteenError>;
    }
}

/// Environment module - Dependency injection traits
///
/// All sources of time and identity are abstracted behind traits and injected,
/// so reducers and services stay deterministic under test.
pub mod environment {
    use crate::types::{OrderId, PickupCode};
    use chrono::{DateTime, Utc};
    use rand::Rng;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use canteen_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of order identifiers and pickup codes.
    ///
    /// Generated values must be collision-resistant. The repository still
    /// rejects a duplicate pickup code, and the ledger draws a new one when
    /// that happens.
    pub trait IdGenerator: Send + Sync {
        /// A fresh order id.
        fn order_id(&self) -> OrderId;

        /// A fresh pickup code.
        fn pickup_code(&self) -> PickupCode;
    }

    /// Characters used in pickup codes: no `0/O`, `1/I/L` or `U`.
    const PICKUP_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTVWXYZ";

    /// Length of the random part of a pickup code.
    const PICKUP_CODE_LEN: usize = 8;

    /// Production generator: random 128-bit order ids, 8-character pickup codes
    /// drawn from the thread-local CSPRNG.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomIdGenerator;

    impl IdGenerator for RandomIdGenerator {
        fn order_id(&self) -> OrderId {
            OrderId::new(uuid::Uuid::new_v4().to_string())
        }

        fn pickup_code(&self) -> PickupCode {
            let mut rng = rand::thread_rng();
            let code: String = (0..PICKUP_CODE_LEN)
                .map(|_| {
                    let idx = rng.gen_range(0..PICKUP_ALPHABET.len());
                    char::from(PICKUP_ALPHABET[idx])
                })
                .collect();
            PickupCode::new(format!("ORD-{code}"))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn random_pickup_codes_use_the_unambiguous_alphabet() {
            let ids = RandomIdGenerator;
            for _ in 0..100 {
                let code = ids.pickup_code();
                let body = code.as_str().trim_start_matches("ORD-");
                assert_eq!(body.len(), PICKUP_CODE_LEN);
                assert!(body.bytes().all(|b| PICKUP_ALPHABET.contains(&b)));
            }
        }

        #[test]
        fn random_order_ids_differ() {
            let ids = RandomIdGenerator;
            assert_ne!(ids.order_id(), ids.order_id());
        }
    }
}
