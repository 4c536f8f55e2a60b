//! Identifier newtypes
//!
//! Entities reference each other by identity only. Each id kind is a
//! distinct type so a door id can never be passed where a credential id is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identity of a door
    DoorId
);
entity_id!(
    /// Identity of a credential
    CredentialId
);
entity_id!(
    /// Identity of a credential type
    CredentialTypeId
);
entity_id!(
    /// Identity of an employee
    EmployeeId
);
entity_id!(
    /// Identity of a logged authorization attempt
    AttemptId
);
