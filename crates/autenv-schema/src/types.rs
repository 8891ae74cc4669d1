//! Newtype wrappers for remote identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings so they can travel
//! through JSON payloads unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
                self.0 == *other
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
    };
}

string_newtype! {
    /// Identifier of a remote AUT Environment.
    EnvironmentId
}

string_newtype! {
    /// Identifier of a remote AUT Environment Configuration.
    ///
    /// The one externally observable output of a workflow run; downstream
    /// build steps consume it.
    ConfigurationId
}

string_newtype! {
    /// Identifier of the remote folder holding a configuration's parameter values.
    FolderId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display_and_deref() {
        let id = ConfigurationId::new("conf_42");
        assert_eq!(id.to_string(), "conf_42");
        assert_eq!(id.as_str(), "conf_42");
        assert!(!id.is_empty());
        assert!(ConfigurationId::new("").is_empty());
    }

    #[test]
    fn newtype_eq_str() {
        let id = EnvironmentId::from("env_1");
        assert_eq!(id, "env_1");
        assert_eq!(id, "env_1".to_owned());
    }

    #[test]
    fn newtype_serde_transparent() {
        let id = FolderId::new("folder_7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"folder_7\"");
        let back: FolderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
