//! # Canteen Testing
//!
//! Testing utilities for the canteen ordering engine.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits (clocks, id generators)
//! - [`InMemoryRepository`]: a `HashMap`-backed [`Repository`](canteen_core::repository::Repository)
//! - [`StaticCatalog`] and [`StaticIdentity`] collaborators
//! - Menu and caller fixtures
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use canteen_testing::{fixtures, InMemoryRepository, StaticCatalog, StaticIdentity, test_clock};
//!
//! #[tokio::test]
//! async fn checkout_clears_the_cart() {
//!     let env = CanteenEnvironment::new(
//!         Arc::new(StaticCatalog::new(fixtures::menu())),
//!         Arc::new(StaticIdentity::new([("alice-token", fixtures::alice())])),
//!         Arc::new(InMemoryRepository::new()),
//!     )
//!     .with_clock(Arc::new(test_clock()));
//!     let canteen = Canteen::new(env);
//!
//!     canteen.add_item(&fixtures::alice(), &fixtures::VEGGIE_BURGER.into()).await?;
//!     canteen.checkout(&fixtures::alice()).await?;
//! }
//! ```

use canteen_core::environment::{Clock, IdGenerator};
use canteen_core::types::{OrderId, PickupCode};
use chrono::{DateTime, Duration, Utc};

pub mod collaborators;
pub mod fixtures;
pub mod memory;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, IdGenerator, OrderId, PickupCode, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError};

    pub use crate::collaborators::{StaticCatalog, StaticIdentity};
    pub use crate::memory::InMemoryRepository;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use canteen_testing::mocks::FixedClock;
    /// use canteen_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step every time it is read.
    ///
    /// Orders created through it get strictly increasing `created_at`, so
    /// newest-first listings have a single correct answer.
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        step: Duration,
        ticks: AtomicI64,
    }

    impl SteppingClock {
        /// Starts at `start`, advancing by `step` after each read.
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                start,
                step,
                ticks: AtomicI64::new(0),
            }
        }

        /// Starts at the [`test_clock`] instant, one second per read.
        #[must_use]
        pub fn per_second() -> Self {
            Self::new(test_clock().now(), Duration::seconds(1))
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            let offset = self.step.checked_mul(i32::try_from(tick).unwrap_or(i32::MAX));
            offset
                .and_then(|o| self.start.checked_add_signed(o))
                .unwrap_or(self.start)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_089))
    }

    /// Predictable ids: `order-1`, `order-2`, ... and `ORD-0001`, `ORD-0002`, ...
    ///
    /// Pickup codes can be scripted with [`SequentialIdGenerator::with_pickup_codes`]
    /// to force collisions.
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        orders: AtomicU64,
        codes: AtomicU64,
        scripted: Mutex<VecDeque<PickupCode>>,
    }

    impl SequentialIdGenerator {
        /// Counters start at 1.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Hand out `codes` first, then fall back to the counter.
        #[must_use]
        pub fn with_pickup_codes<I, S>(codes: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                scripted: Mutex::new(codes.into_iter().map(PickupCode::new).collect()),
                ..Self::default()
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn order_id(&self) -> OrderId {
            let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
            OrderId::new(format!("order-{n}"))
        }

        fn pickup_code(&self) -> PickupCode {
            let scripted = self
                .scripted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            scripted.unwrap_or_else(|| {
                let n = self.codes.fetch_add(1, Ordering::SeqCst) + 1;
                PickupCode::new(format!("ORD-{n:04}"))
            })
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Safe to call from every test; only the first call installs it.
    /// Honors `RUST_LOG`.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use canteen_core::money::Money;
    use canteen_core::types::ItemId;
    use proptest::prelude::*;

    /// Non-negative prices up to $500.00.
    pub fn price() -> impl Strategy<Value = Money> {
        (0i64..=50_000).prop_map(Money::from_cents)
    }

    /// One of the seeded menu item ids.
    pub fn menu_item_id() -> impl Strategy<Value = ItemId> {
        prop::sample::select(crate::fixtures::MENU_IDS.to_vec()).prop_map(ItemId::new)
    }
}

// Re-export commonly used items
pub use collaborators::{StaticCatalog, StaticIdentity};
pub use memory::InMemoryRepository;
pub use mocks::{FixedClock, SequentialIdGenerator, SteppingClock, test_clock};
pub use reducer_test::ReducerTest;
