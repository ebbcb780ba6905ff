//! Wiring the engine for the server binary.
//!
//! Storage is PostgreSQL when `DATABASE_URL` is set and in-memory otherwise.
//! The catalog is the seeded canteen menu and callers are resolved from a
//! static bearer-token table.

use crate::config::Config;
use anyhow::Context;
use canteen_core::repository::Repository;
use canteen_core::types::Caller;
use canteen_engine::{Canteen, CanteenEnvironment, EngineConfig};
use canteen_postgres::PostgresRepository;
use canteen_testing::{InMemoryRepository, StaticCatalog, StaticIdentity, fixtures};
use std::sync::Arc;

/// Demo bearer token for a customer.
pub const DEMO_CUSTOMER_TOKEN: &str = "customer-token";

/// Demo bearer token for a staff member.
pub const DEMO_STAFF_TOKEN: &str = "staff-token";

/// Token table, seeded with the demo callers when `demo_tokens` is set.
#[must_use]
pub fn identity(demo_tokens: bool) -> StaticIdentity {
    if demo_tokens {
        StaticIdentity::new([
            (DEMO_CUSTOMER_TOKEN, Caller::customer("demo-customer")),
            (DEMO_STAFF_TOKEN, Caller::staff("demo-staff")),
        ])
    } else {
        tracing::warn!("Demo tokens disabled and no identity provider configured; every request will be unauthenticated");
        StaticIdentity::default()
    }
}

/// Connect storage: PostgreSQL (migrated) or in-memory.
///
/// # Errors
///
/// Fails if the database cannot be reached or migrated.
pub async fn repository(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    match &config.postgres {
        Some(pg) => {
            tracing::info!(max_connections = pg.max_connections, "Connecting to PostgreSQL");
            let repository = PostgresRepository::connect(&pg.url, pg.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            repository.migrate().await.context("migrating schema")?;
            tracing::info!("PostgreSQL ready");
            Ok(Arc::new(repository))
        },
        None => {
            tracing::warn!("DATABASE_URL not set; orders are kept in memory and lost on restart");
            Ok(Arc::new(InMemoryRepository::new()))
        },
    }
}

/// Build the engine described by `config`.
///
/// # Errors
///
/// Fails if storage cannot be set up.
pub async fn build_canteen(config: &Config) -> anyhow::Result<Canteen> {
    let env = CanteenEnvironment::new(
        Arc::new(StaticCatalog::new(fixtures::menu())),
        Arc::new(identity(config.server.demo_tokens)),
        repository(config).await?,
    )
    .with_config(EngineConfig::default().with_cas_attempts(config.engine.cas_attempts));

    Ok(Canteen::new(env))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use canteen_core::identity::{Credential, Identity, IdentityError};

    #[tokio::test]
    async fn test_demo_tokens() {
        let identity = identity(true);
        let staff = identity
            .resolve_caller(&Credential::new(DEMO_STAFF_TOKEN))
            .await
            .unwrap();
        assert!(staff.is_staff());

        let customer = identity
            .resolve_caller(&Credential::new(DEMO_CUSTOMER_TOKEN))
            .await
            .unwrap();
        assert!(!customer.is_staff());
    }

    #[tokio::test]
    async fn test_no_demo_tokens() {
        let identity = identity(false);
        let err = identity
            .resolve_caller(&Credential::new(DEMO_STAFF_TOKEN))
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::Unauthenticated);
    }
}
