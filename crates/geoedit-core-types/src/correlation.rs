//! Correlation identifiers
//!
//! An editing session and every command submitted to its history carry a
//! time-ordered UUID, so that log events emitted while executing, undoing and
//! redoing can be tied back to one another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh UUIDv7, ordered by creation time
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

correlation_id!(
    /// One command submitted to an undo/redo history, stable across undo and redo
    CommandId
);

correlation_id!(
    /// One editing session over one data layer
    SessionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(CommandId::new(), CommandId::new());
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_display_parses_back() {
        let id = SessionId::new();

        let parsed: SessionId = id.to_string().parse().unwrap();

        assert_eq!(parsed, id);
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = CommandId::from(Uuid::nil());

        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let back: CommandId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!("not-a-uuid".parse::<CommandId>().is_err());
    }
}
