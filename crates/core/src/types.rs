//! Identifier types shared across the connector
//!
//! Every long-lived object the pool manager or the application can hold on
//! to carries a UUID v4 identifier. Identity comparisons between objects use
//! pointer equality; these ids exist for logging, events and registries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random id using UUID v4
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            /// Create an id from raw bytes
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                $name(Uuid::from_bytes(bytes))
            }

            /// Get raw bytes representation
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a managed connection
    ///
    /// Used by connection managers to key their registries and by
    /// connection events to name their source.
    ConnectionId
);

uuid_id!(
    /// Unique identifier for an application-facing connection handle
    HandleId
);

uuid_id!(
    /// Unique identifier for a managed connection factory
    ///
    /// Credentials inside a [`Subject`](crate::Subject) are tagged with the
    /// factory they belong to, and connection matching only considers
    /// connections created by the same factory.
    FactoryId
);
