//! Shared wiring for the engine integration tests.

#![allow(dead_code)] // Each test binary uses a different subset
#![allow(clippy::unwrap_used)]

use canteen_core::environment::Clock;
use canteen_core::types::{Caller, ItemId};
use canteen_engine::{Canteen, CanteenEnvironment, EngineConfig};
use canteen_testing::{
    InMemoryRepository, SequentialIdGenerator, StaticCatalog, StaticIdentity, fixtures, test_clock,
};
use std::sync::Arc;
use std::time::Duration;

/// A canteen over in-memory collaborators, with handles kept for poking at them.
pub struct Harness {
    pub canteen: Canteen,
    pub catalog: StaticCatalog,
    pub identity: StaticIdentity,
    pub repository: InMemoryRepository,
}

impl Harness {
    /// Seeded menu, fixed clock, sequential ids, no backoff.
    pub fn new() -> Self {
        Self::build(Arc::new(test_clock()), SequentialIdGenerator::new(), fast_config())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::build(clock, SequentialIdGenerator::new(), fast_config())
    }

    pub fn with_ids(ids: SequentialIdGenerator) -> Self {
        Self::build(Arc::new(test_clock()), ids, fast_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(Arc::new(test_clock()), SequentialIdGenerator::new(), config)
    }

    fn build(clock: Arc<dyn Clock>, ids: SequentialIdGenerator, config: EngineConfig) -> Self {
        canteen_testing::helpers::init_test_tracing();

        let catalog = StaticCatalog::new(fixtures::menu());
        let identity = StaticIdentity::new([
            ("alice-token", fixtures::alice()),
            ("bob-token", fixtures::bob()),
            ("chef-token", fixtures::chef()),
        ]);
        let repository = InMemoryRepository::new();

        let env = CanteenEnvironment::new(
            Arc::new(catalog.clone()),
            Arc::new(identity.clone()),
            Arc::new(repository.clone()),
        )
        .with_clock(clock)
        .with_ids(Arc::new(ids))
        .with_config(config);

        Self {
            canteen: Canteen::new(env),
            catalog,
            identity,
            repository,
        }
    }

    /// Add `quantity` units of `item` to the caller's cart, one at a time.
    pub async fn add(&self, caller: &Caller, item: &str, quantity: u32) {
        for _ in 0..quantity {
            self.canteen.add_item(caller, &ItemId::new(item)).await.unwrap();
        }
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig::default().with_cas_backoff(Duration::ZERO)
}

pub fn item(id: &str) -> ItemId {
    ItemId::new(id)
}
