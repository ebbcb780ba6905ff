//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`AuthenticatedCaller`]: the caller resolved from the bearer token
//!
//! # Examples
//!
//! ```ignore
//! async fn get_cart(
//!     State(state): State<AppState>,
//!     AuthenticatedCaller(caller): AuthenticatedCaller,
//! ) -> Result<Json<CartSnapshot>, AppError> {
//!     Ok(Json(state.canteen.cart(&caller).await?))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::{CORRELATION_ID_HEADER, parse_correlation_id};
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use canteen_core::identity::Credential;
use canteen_core::types::Caller;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| parse_correlation_id(parts.headers.get(CORRELATION_ID_HEADER)))
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The caller behind the request's `Authorization: Bearer <token>` header.
///
/// Rejects with 401 when the header is missing or malformed, or the identity
/// provider does not know the token, and with 503 when the provider is down.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Caller);

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let caller = state.canteen.authenticate(&Credential::new(token)).await?;
        tracing::debug!(user_id = %caller.user_id, role = %caller.role, "Caller resolved");
        Ok(Self(caller))
    }
}
