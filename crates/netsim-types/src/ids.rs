//! Type-safe identifier wrappers.
//!
//! Two families of identifiers exist in the kernel:
//!
//! - **Generated ids** ([`MissionId`], [`ArcId`], [`OperationId`],
//!   [`MessageId`], [`TransactionId`]) wrap a UUID v7 so they are unique and
//!   time-ordered without a central counter.
//! - **Catalog keys** ([`NetworkId`], [`DeviceIp`], [`FileSystemId`],
//!   [`ClientId`], [`AccountId`]) wrap a `String` because they come from
//!   static tables or from generated network blueprints and must stay
//!   human-readable in save files.
//!
//! Mixing the two (or two ids of the same family) is a compile error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around [`String`] for catalog keys.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from anything string-like.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a generated mission.
    MissionId
}

define_id! {
    /// Unique identifier shared by every mission of one storyline arc.
    ArcId
}

define_id! {
    /// Unique identifier for a bandwidth-consuming operation.
    OperationId
}

define_id! {
    /// Unique identifier for an inbox message.
    MessageId
}

define_id! {
    /// Unique identifier for a bank transaction record.
    TransactionId
}

define_key! {
    /// Registry key of a network (e.g. `"net-clinic-7f3a"`).
    NetworkId
}

define_key! {
    /// Address of a device, unique across the registry (e.g. `"10.4.12.7"`).
    DeviceIp
}

define_key! {
    /// Registry key of a device's file system.
    FileSystemId
}

define_key! {
    /// Key of a client in the static client catalog.
    ClientId
}

define_key! {
    /// Key of a bank account held by the player.
    AccountId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = MissionId::new();
        let b = MissionId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let id = NetworkId::new("net-home");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"net-home\""));
    }

    #[test]
    fn key_display_matches_inner() {
        let ip = DeviceIp::from("10.0.0.1");
        assert_eq!(ip.to_string(), "10.0.0.1");
        assert_eq!(ip.as_str(), "10.0.0.1");
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = ArcId::new();
        let json = serde_json::to_string(&original).ok();
        let restored: Result<ArcId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(matches!(restored, Ok(id) if id == original));
    }
}
