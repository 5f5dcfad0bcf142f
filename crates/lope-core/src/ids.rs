//! Branded ID newtypes for type safety.
//!
//! Every entity in the lope model has a distinct ID type implemented as a
//! newtype wrapper around `String`. This prevents accidentally passing a
//! turn ID where a part ID is expected.
//!
//! All generated IDs are UUID v7 (time-ordered) via [`uuid::Uuid::now_v7`].
//! Provider-assigned identifiers (tool call IDs) are wrapped as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a session.
    SessionId
}

branded_id! {
    /// Unique identifier for a turn within a session.
    TurnId
}

branded_id! {
    /// Unique identifier for a part within a turn.
    PartId
}

branded_id! {
    /// Provider-assigned identifier for a tool call, unique within a turn.
    ToolCallId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TurnId::new();
        let b = TurnId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn id_roundtrip_through_string() {
        let id = PartId::new();
        let s: String = id.clone().into();
        let back = PartId::from_string(s);
        assert_eq!(id, back);
    }

    #[test]
    fn id_from_str_preserves_value() {
        let id = ToolCallId::from("call_abc123");
        assert_eq!(id.as_str(), "call_abc123");
        assert_eq!(id.to_string(), "call_abc123");
    }

    #[test]
    fn serde_transparent() {
        let id = SessionId::from("sess-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sess-1\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn v7_ids_are_time_ordered() {
        let a = TurnId::new();
        let b = TurnId::new();
        assert!(a.as_str() <= b.as_str());
    }
}
