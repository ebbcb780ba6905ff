//! Application state for Axum handlers.

use canteen_engine::Canteen;

/// Application state shared across all HTTP handlers.
///
/// Cloning is cheap: the engine shares its collaborators behind `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The engine, behind its caller-aware facade
    pub canteen: Canteen,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(canteen: Canteen) -> Self {
        Self { canteen }
    }
}
