//! # Canteen Engine
//!
//! The order and cart state engine, driven over injected collaborators.
//!
//! The engine wraps the pure reducers of `canteen-core` in async services that
//! load state from a [`Repository`](canteen_core::repository::Repository),
//! reduce, and write back with an optimistic version check:
//!
//! - [`CartEngine`]: per-user basket, live-priced snapshots
//! - [`OrderLedger`]: checkout, order lookup and listings, reorder
//! - [`PaymentGate`]: one-shot payment resolution
//! - [`Fulfillment`]: staff-driven status transitions and the staff queue
//! - [`Menu`]: menu listing and per-user favorites
//! - [`Canteen`]: caller-aware facade enforcing who may do what
//!
//! ## Concurrency
//!
//! Every write names the record version it read. A conflicting write is
//! retried from a fresh read, up to [`EngineConfig::cas_attempts`] times. Two
//! racing callers can therefore never both succeed against the same prior
//! state: the loser re-runs its reducer on the winner's result, which is where
//! the one-shot payment guard and the status graph reject it.
//!
//! ## Example
//!
//! ```ignore
//! use canteen_engine::{Canteen, CanteenEnvironment, EngineConfig};
//!
//! let env = CanteenEnvironment::new(catalog, identity, repository)
//!     .with_config(EngineConfig::default());
//! let canteen = Canteen::new(env);
//!
//! canteen.add_item(&caller, &ItemId::new("1")).await?;
//! let order = canteen.checkout(&caller).await?;
//! canteen.resolve_payment(&caller, order.id(), PaymentMethod::Cash, PaymentOutcome::Success).await?;
//! ```

pub mod canteen;
pub mod cart;
pub mod environment;
pub mod fulfillment;
pub mod ledger;
pub mod menu;
pub mod metrics;
pub mod payment;
pub mod retry;

pub use canteen::Canteen;
pub use cart::CartEngine;
pub use environment::{CanteenEnvironment, EngineConfig};
pub use fulfillment::{Fulfillment, QueueSummary};
pub use ledger::OrderLedger;
pub use menu::Menu;
pub use payment::PaymentGate;
