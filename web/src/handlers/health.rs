//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use canteen_core::catalog::Catalog;
use canteen_core::repository::Repository;
use canteen_core::types::OrderId;
use serde::Serialize;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report.
#[derive(Debug, Serialize)]
pub struct Readiness {
    /// `ready` or `unavailable`
    pub status: &'static str,
    /// Whether the catalog answered
    pub catalog: bool,
    /// Whether storage answered
    pub storage: bool,
}

/// Readiness check: probes the catalog and storage.
///
/// # Status Codes
///
/// - 200 OK: both collaborators answered
/// - 503 Service Unavailable: otherwise
///
/// ```text
/// GET /health/ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let env = state.canteen.env();

    let catalog = env
        .catalog
        .list_items()
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "Readiness: catalog unavailable"))
        .is_ok();
    let storage = env
        .repository
        .load_order(&OrderId::new("readiness-probe"))
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "Readiness: storage unavailable"))
        .is_ok();

    let (status, label) = if catalog && storage {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(Readiness {
            status: label,
            catalog,
            storage,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
