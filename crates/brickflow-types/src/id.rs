//! Registry and correlation identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error produced when parsing a registry identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The id does not start with the `@` sigil.
    #[error("registry id must start with '@': {0:?}")]
    MissingSigil(String),
    /// The id has no `/name` part after the scope.
    #[error("registry id must have the form '@scope/name': {0:?}")]
    MissingName(String),
    /// A segment contains a character outside `[A-Za-z0-9._-]`.
    #[error("invalid character in registry id: {0:?}")]
    InvalidCharacter(String),
}

/// Namespaced brick identifier: `@scope/name`.
///
/// Both segments are non-empty and limited to alphanumerics plus `.`, `_`
/// and `-`. The id is stored in its canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryId(String);

impl RegistryId {
    /// Parse and validate a registry id.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        let Some(rest) = id.strip_prefix('@') else {
            return Err(IdError::MissingSigil(id));
        };
        let Some((scope, name)) = rest.split_once('/') else {
            return Err(IdError::MissingName(id));
        };
        if scope.is_empty() || name.is_empty() {
            return Err(IdError::MissingName(id));
        }
        let valid = |s: &str| {
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        };
        if !valid(scope) || !valid(name) {
            return Err(IdError::InvalidCharacter(id));
        }
        Ok(Self(id))
    }

    /// Build an id from pre-validated scope and name segments.
    ///
    /// Intended for compile-time-known ids of built-in bricks. Segment
    /// validity is checked in debug builds only.
    pub fn from_parts(scope: &str, name: &str) -> Self {
        let id = Self(format!("@{scope}/{name}"));
        debug_assert!(Self::new(id.as_str()).is_ok(), "invalid builtin id: {id}");
        id
    }

    /// The canonical `@scope/name` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scope segment (without the `@` sigil).
    pub fn scope(&self) -> &str {
        // Validated in the constructor: '@' prefix and a '/' separator exist.
        let rest = &self.0[1..];
        rest.split('/').next().unwrap_or(rest)
    }

    /// The name segment.
    pub fn name(&self) -> &str {
        let rest = &self.0[1..];
        rest.split_once('/').map(|(_, name)| name).unwrap_or(rest)
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RegistryId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for RegistryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RegistryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a caller-supplied identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id! {
    /// Opaque identifier of a single brick placement, stable across edits.
    ///
    /// Assigned by the editor; the runtime only uses it to correlate trace
    /// records with configuration.
    InstanceId
}

opaque_id! {
    /// Opaque identifier of one activated mod component.
    ///
    /// The grouping key for trace records and shared state.
    ModComponentId
}
