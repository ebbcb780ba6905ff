//! HTTP error mapping.
//!
//! Every handler returns `Result<_, AppError>`. Engine errors convert through
//! `?`, keeping the machine code from [`CanteenError::code`] and choosing the
//! status from the error kind.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use canteen_core::error::CanteenError;
use canteen_core::fulfillment::staff_successors;
use canteen_core::identity::IdentityError;
use canteen_core::order::OrderStatus;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Renders as `{"code": ..., "message": ...}` with the matching status.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>, caller: AuthenticatedCaller) -> Result<Json<Order>, AppError> {
///     let order = state.canteen.checkout(&caller.0).await?;
///     Ok(Json(order))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status this error renders with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHENTICATED")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Request failed"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<CanteenError> for AppError {
    fn from(err: CanteenError) -> Self {
        let status = match &err {
            CanteenError::NotFound { .. } => StatusCode::NOT_FOUND,
            CanteenError::ItemUnavailable(_)
            | CanteenError::InvalidState(_)
            | CanteenError::IllegalTransition { .. } => StatusCode::CONFLICT,
            CanteenError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            CanteenError::Forbidden(_) => StatusCode::FORBIDDEN,
            CanteenError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let message = match &err {
            CanteenError::IllegalTransition { from, .. } => {
                let allowed = staff_successors(*from);
                if allowed.is_empty() {
                    format!("{err}; {from} is final")
                } else {
                    let allowed: Vec<&str> = allowed.into_iter().map(OrderStatus::as_str).collect();
                    format!("{err}; allowed: {}", allowed.join(", "))
                }
            },
            _ => err.to_string(),
        };
        Self::new(status, message, err.code())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated => Self::unauthorized(err.to_string()),
            IdentityError::Unavailable(_) => CanteenError::from(err).into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteen_core::types::ItemId;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_engine_errors_map_to_statuses() {
        let cases = [
            (CanteenError::order_not_found("o-1"), StatusCode::NOT_FOUND),
            (
                CanteenError::ItemUnavailable(ItemId::new("3")),
                StatusCode::CONFLICT,
            ),
            (CanteenError::EmptyCart, StatusCode::UNPROCESSABLE_ENTITY),
            (
                CanteenError::InvalidState("already paid".into()),
                StatusCode::CONFLICT,
            ),
            (
                CanteenError::IllegalTransition {
                    from: OrderStatus::Completed,
                    to: OrderStatus::Preparing,
                },
                StatusCode::CONFLICT,
            ),
            (CanteenError::Forbidden("staff only".into()), StatusCode::FORBIDDEN),
            (
                CanteenError::DependencyUnavailable("catalog: timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            let code = err.code();
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn test_illegal_transition_lists_allowed_targets() {
        let err: AppError = CanteenError::IllegalTransition {
            from: OrderStatus::Preparing,
            to: OrderStatus::Completed,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "[ILLEGAL_TRANSITION] Illegal transition from preparing to completed; allowed: ready, cancelled"
        );

        let err: AppError = CanteenError::IllegalTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Preparing,
        }
        .into();
        assert!(err.to_string().ends_with("completed is final"));
    }

    #[test]
    fn test_identity_errors() {
        let err: AppError = IdentityError::Unauthenticated.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "UNAUTHENTICATED");

        let err: AppError = IdentityError::Unavailable("down".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "DEPENDENCY_UNAVAILABLE");
    }
}
