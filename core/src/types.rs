//! Identifiers and caller types shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for parsing identifiers and roles from external input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind}: {value:?}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "` (no validation, for trusted input).")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the inner string value
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseError {
                        kind: $kind,
                        value: s.to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a customer or staff member, as resolved by the identity provider.
    UserId,
    "user id"
);

string_id!(
    /// Identifier of a catalog (menu) item.
    ItemId,
    "item id"
);

string_id!(
    /// Unique identifier of an order.
    OrderId,
    "order id"
);

string_id!(
    /// Opaque token the customer presents to claim an order at the counter.
    PickupCode,
    "pickup code"
);

/// Role of a resolved caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Orders food for themselves.
    Customer,
    /// Runs the kitchen and the counter.
    Staff,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // The storefront calls customers "user".
            "customer" | "user" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            _ => Err(ParseError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// A caller as resolved by the identity provider. Trusted as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Who is calling.
    pub user_id: UserId,
    /// What they may do.
    pub role: Role,
}

impl Caller {
    /// Creates a caller with an explicit role.
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
        }
    }

    /// A customer caller.
    #[must_use]
    pub fn customer(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Customer)
    }

    /// A staff caller.
    #[must_use]
    pub fn staff(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Staff)
    }

    /// Whether the caller is staff.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_and_trim() {
        let id: ItemId = " 5 ".parse().unwrap_or_else(|_| ItemId::new("?"));
        assert_eq!(id, ItemId::new("5"));
        assert!("   ".parse::<OrderId>().is_err());
    }

    #[test]
    fn role_accepts_storefront_alias() {
        assert_eq!("user".parse::<Role>(), Ok(Role::Customer));
        assert_eq!("STAFF".parse::<Role>(), Ok(Role::Staff));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&UserId::new("u-1")).unwrap_or_default();
        assert_eq!(json, "\"u-1\"");
    }
}
