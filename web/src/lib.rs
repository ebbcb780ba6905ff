//! HTTP adapter for the canteen engine.
//!
//! Handlers are a thin imperative shell: they resolve the caller from the
//! bearer token, call one [`Canteen`](canteen_engine::Canteen) operation and
//! map the result. Every rule lives in the engine.
//!
//! # Request Flow
//!
//! 1. **Correlation id** attached by [`middleware::correlation_id_layer`]
//! 2. **Caller** resolved by [`extractors::AuthenticatedCaller`]
//! 3. **Operation** run on the engine
//! 4. **Errors** mapped to status codes by [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use canteen_web::{AppState, router::build_router};
//!
//! let app = build_router(AppState::new(canteen));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use extractors::{AuthenticatedCaller, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
