//! Injected collaborators and engine tunables.

use canteen_core::catalog::Catalog;
use canteen_core::environment::{Clock, IdGenerator, RandomIdGenerator, SystemClock};
use canteen_core::identity::Identity;
use canteen_core::order::OrderEnvironment;
use canteen_core::repository::Repository;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Engine tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times a read-reduce-write cycle is attempted before a version
    /// conflict is reported as `InvalidState`.
    pub cas_attempts: usize,
    /// Base delay between attempts. Doubles each time, with jitter.
    pub cas_backoff: Duration,
}

impl EngineConfig {
    /// Default number of attempts.
    pub const DEFAULT_CAS_ATTEMPTS: usize = 8;

    /// Set the attempt budget (at least 1).
    #[must_use]
    pub fn with_cas_attempts(mut self, attempts: usize) -> Self {
        self.cas_attempts = attempts.max(1);
        self
    }

    /// Set the base backoff.
    #[must_use]
    pub const fn with_cas_backoff(mut self, backoff: Duration) -> Self {
        self.cas_backoff = backoff;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cas_attempts: Self::DEFAULT_CAS_ATTEMPTS,
            cas_backoff: Duration::from_millis(2),
        }
    }
}

/// Everything the engine services depend on.
///
/// Cloning is cheap: collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct CanteenEnvironment {
    /// Menu lookups
    pub catalog: Arc<dyn Catalog>,
    /// Caller resolution
    pub identity: Arc<dyn Identity>,
    /// Cart, order and favorite storage
    pub repository: Arc<dyn Repository>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Order id and pickup code source
    pub ids: Arc<dyn IdGenerator>,
    /// Tunables
    pub config: EngineConfig,
}

impl CanteenEnvironment {
    /// Production defaults: wall clock and random ids.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        identity: Arc<dyn Identity>,
        repository: Arc<dyn Repository>,
    ) -> Self {
        Self {
            catalog,
            identity,
            repository,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
            config: EngineConfig::default(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the id generator.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the tunables.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Environment handed to the order reducers.
    #[must_use]
    pub fn order_environment(&self) -> OrderEnvironment {
        OrderEnvironment::new(Arc::clone(&self.clock))
    }
}

impl fmt::Debug for CanteenEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanteenEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
