//! Router configuration for the canteen API.

use crate::handlers::{cart, favorites, health, menu, orders, staff};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// API routes, relative to `/api/v1`.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Menu (public)
        .route("/menu", get(menu::list_menu))
        // Cart
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/:item_id",
            put(cart::set_quantity).delete(cart::remove_item),
        )
        // Orders
        .route("/checkout", post(orders::checkout))
        .route("/orders", get(orders::list_my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/payment", post(orders::resolve_payment))
        .route("/orders/:id/reorder", post(orders::reorder))
        .route("/orders/:id/status", post(orders::update_status))
        // Staff
        .route("/staff/orders", get(staff::list_all_orders))
        .route("/staff/queue", get(staff::queue))
        .route("/staff/queue/summary", get(staff::queue_summary))
        // Favorites
        .route("/favorites", get(favorites::list_favorites))
        .route(
            "/favorites/:item_id",
            get(favorites::is_favorite)
                .put(favorites::add_favorite)
                .delete(favorites::remove_favorite),
        )
}

/// Browsers may call the API from any origin with a bearer token.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([HeaderName::from_static("x-correlation-id")])
}

/// Build the complete Axum router.
///
/// # Routes
///
/// - `GET /health`, `GET /health/ready`
/// - everything in the handler modules, under `/api/v1`
///
/// Layers, outermost first: correlation id, CORS, request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors())
        .layer(correlation_id_layer())
        .with_state(state)
}
