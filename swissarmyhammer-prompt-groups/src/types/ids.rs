//! Identifier newtypes
//!
//! Group ids are generated ULIDs assigned when a group is created, never
//! derived from the group's display name, so two groups called "Scene" keep
//! separate cache slots. Entry ids are opaque strings owned by the external
//! order list.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Stable identity of a group
    GroupId
);

string_id!(
    /// Identity of a prompt entry in the authoritative order list
    EntryId
);

string_id!(
    /// Ticket handed out for a toggle awaiting a validation decision
    ToggleTicket
);

/// Well-known id of the TopLevel group
const TOP_LEVEL_ID: &str = "top-level";

impl GroupId {
    /// Generate a fresh id for a newly created group
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// The singleton TopLevel group id
    pub fn top_level() -> Self {
        Self(TOP_LEVEL_ID.to_string())
    }

    /// Check if this is the TopLevel group id
    pub fn is_top_level(&self) -> bool {
        self.0 == TOP_LEVEL_ID
    }
}

impl ToggleTicket {
    /// Generate a fresh ticket
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}
