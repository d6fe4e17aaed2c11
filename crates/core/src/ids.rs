//! Server-issued identifiers.
//!
//! All ids are opaque to the engine: they are compared, hashed and echoed
//! back to the server, never computed.

use serde::{Deserialize, Serialize};

macro_rules! server_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw server id.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw server id.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }
    };
}

server_id!(
    /// Identifier of a persisted assignment row.
    AssignmentId
);
server_id!(
    /// Identifier of a question in the question registry.
    QuestionId
);
server_id!(
    /// Identifier of an individual user.
    UserId
);
server_id!(
    /// Identifier of a user group.
    GroupId
);
server_id!(
    /// Identifier of a question category.
    CategoryId
);
