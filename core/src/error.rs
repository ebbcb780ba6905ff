//! Error taxonomy returned by every engine operation.
//!
//! Collaborator failures (catalog, identity, storage) are mapped into
//! [`CanteenError::DependencyUnavailable`]. The engine never retries those;
//! retry policy belongs to the caller.

use crate::catalog::CatalogError;
use crate::identity::IdentityError;
use crate::order::OrderStatus;
use crate::repository::RepositoryError;
use crate::types::ItemId;
use std::fmt;
use thiserror::Error;

/// Kind of record a [`CanteenError::NotFound`] refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    /// A catalog item.
    Item,
    /// An order.
    Order,
    /// A favorite entry.
    Favorite,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "Item"),
            Self::Order => write!(f, "Order"),
            Self::Favorite => write!(f, "Favorite"),
        }
    }
}

/// Errors returned by cart, ledger, payment and fulfillment operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanteenError {
    /// The referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record.
        entity: Entity,
        /// The id that was looked up.
        id: String,
    },

    /// The catalog item cannot be ordered right now.
    #[error("Item {0} is not available")]
    ItemUnavailable(ItemId),

    /// Checkout was attempted with no lines in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The operation does not apply to the record's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The requested status is not a direct successor of the current one.
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// The caller lacks the role or ownership the operation requires.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A collaborator (catalog, identity, storage) failed or timed out.
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl CanteenError {
    /// Shorthand for a missing order.
    #[must_use]
    pub fn order_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: Entity::Order,
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing catalog item.
    #[must_use]
    pub fn item_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: Entity::Item,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code, used by the HTTP layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ItemUnavailable(_) => "ITEM_UNAVAILABLE",
            Self::EmptyCart => "EMPTY_CART",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
        }
    }
}

impl From<CatalogError> for CanteenError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::item_not_found(id),
            CatalogError::Unavailable(msg) => Self::DependencyUnavailable(format!("catalog: {msg}")),
        }
    }
}

impl From<IdentityError> for CanteenError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated => Self::Forbidden("caller is not authenticated".into()),
            IdentityError::Unavailable(msg) => {
                Self::DependencyUnavailable(format!("identity: {msg}"))
            },
        }
    }
}

impl From<RepositoryError> for CanteenError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { .. }
            | RepositoryError::DuplicateOrder(_)
            | RepositoryError::DuplicatePickupCode(_) => Self::InvalidState(err.to_string()),
            RepositoryError::Backend(_) | RepositoryError::Serialization(_) => {
                Self::DependencyUnavailable(format!("storage: {err}"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_and_codes() {
        let err = CanteenError::order_not_found("o-1");
        assert_eq!(err.to_string(), "Order o-1 not found");
        assert_eq!(err.code(), "NOT_FOUND");

        let err = CanteenError::IllegalTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Preparing,
        };
        assert_eq!(err.to_string(), "Illegal transition from completed to preparing");
    }

    #[test]
    fn collaborator_failures_become_dependency_unavailable() {
        let err: CanteenError = CatalogError::Unavailable("timeout".into()).into();
        assert!(matches!(err, CanteenError::DependencyUnavailable(_)));

        let err: CanteenError = RepositoryError::Backend("connection reset".into()).into();
        assert_eq!(err.code(), "DEPENDENCY_UNAVAILABLE");
    }
}
