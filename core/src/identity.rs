//! Identity collaborator: turns a presented credential into a caller.
//!
//! The engine trusts the resolution and never re-validates credentials.

use crate::types::Caller;
use futures::future::BoxFuture;
use std::fmt;
use thiserror::Error;

/// Opaque credential presented by a client (e.g. a bearer token).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw credential.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw credential.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Errors from resolving a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The credential is unknown, expired or malformed.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The identity provider could not be reached.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Caller resolution capability.
pub trait Identity: Send + Sync {
    /// Resolve a credential to a user id and role.
    ///
    /// # Errors
    ///
    /// [`IdentityError::Unauthenticated`] for a credential that does not map to
    /// a user, [`IdentityError::Unavailable`] if the provider cannot be reached.
    fn resolve_caller<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Caller, IdentityError>>;
}
