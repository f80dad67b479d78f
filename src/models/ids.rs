//! Opaque identifiers handed out by the storage backend.
//!
//! All three are fixed-size 16 byte keys rendered as hyphenated text. Path
//! segments are tried against these parsers first; anything that fails to
//! parse is treated as a display name.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        /// The nil identifier.
        impl Default for $name {
            fn default() -> Self {
                Self(Uuid::nil())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::try_parse(s).map(Self)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a container (bucket).
    BucketId
);
opaque_id!(
    /// Identifier of a stored object within its bucket.
    ObjectId
);
opaque_id!(
    /// Identity owning buckets and objects.
    OwnerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parses_back() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn display_names_are_not_ids() {
        assert!("report.txt".parse::<ObjectId>().is_err());
        assert!("b1".parse::<BucketId>().is_err());
        assert!("".parse::<BucketId>().is_err());
    }

    #[test]
    fn default_is_nil_and_new_is_not() {
        assert!(OwnerId::default().as_uuid().is_nil());
        assert_ne!(OwnerId::new(), OwnerId::default());
    }
}
