//! Opaque identifier wrappers.
//!
//! Identifiers are assigned by the backend and never interpreted by the
//! tracker. They are kept as strings, but the backend is known to emit
//! numeric emergency ids in some responses, so deserialization accepts
//! either a JSON string or a JSON integer and normalizes to a string.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

/// Wire representation accepted for an identifier.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

/// Generates a newtype wrapper around a backend-assigned string id.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier assigned by the backend.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(String::from(raw)))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier assigned to an emergency at submission time.
    ///
    /// Immutable; the key for every subsequent status, hospital and notify
    /// call.
    EmergencyId
}

define_id! {
    /// Identifier of a hospital in the backend registry.
    HospitalId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_string_ids() {
        let id: Option<EmergencyId> = serde_json::from_str("\"emer_123\"").ok();
        assert_eq!(id.as_ref().map(EmergencyId::as_str), Some("emer_123"));
    }

    #[test]
    fn deserializes_numeric_ids_as_strings() {
        let id: Option<EmergencyId> = serde_json::from_str("42").ok();
        assert_eq!(id, Some(EmergencyId::new("42")));
        let encoded = id.and_then(|id| serde_json::to_string(&id).ok());
        assert_eq!(encoded.as_deref(), Some("\"42\""));
    }

    #[test]
    fn rejects_non_scalar_ids() {
        let result: Result<HospitalId, _> = serde_json::from_str("{\"id\": 1}");
        assert!(result.is_err());
    }

    #[test]
    fn display_matches_inner() {
        let id = HospitalId::from("city_general");
        assert_eq!(id.to_string(), "city_general");
        assert_eq!(id.into_inner(), "city_general");
    }
}
