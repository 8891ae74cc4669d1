//! Parameter descriptors and the closed kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The source category a parameter's value is drawn from.
///
/// `Undefined` is the explicit legacy arm: job files written against a newer
/// format may carry kinds this build does not know, and those must fold to a
/// harmless no-value parameter instead of failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    /// Literal text, `${VAR}` placeholders expanded against the build environment.
    UserDefined,
    /// The raw value names a build environment variable; its value is used.
    Environment,
    /// The value is extracted from a field of an external JSON document.
    External,
    /// Unknown kind retained for forward compatibility; resolves to empty.
    #[serde(other)]
    Undefined,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UserDefined => "user-defined",
            Self::Environment => "environment",
            Self::External => "external",
            Self::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

/// Immutable description of one AUT Environment parameter.
///
/// Created by the job configuration layer; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name, unique within a configuration.
    pub name: String,
    /// Template string; meaning depends on `kind`.
    pub raw_value: String,
    pub kind: ParameterKind,
    /// For `External` sequence values: take only the first element.
    #[serde(default)]
    pub first_value_only: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, raw_value: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            raw_value: raw_value.into(),
            kind,
            first_value_only: false,
        }
    }

    #[must_use]
    pub fn first_value_only(mut self, yes: bool) -> Self {
        self.first_value_only = yes;
        self
    }
}

/// A descriptor paired with its value computed for the current run.
///
/// Created fresh on every orchestration run and discarded once the remote
/// update completes or fails; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParameter {
    pub descriptor: ParameterDescriptor,
    pub value: String,
}

impl ResolvedParameter {
    pub fn new(descriptor: ParameterDescriptor, value: impl Into<String>) -> Self {
        Self {
            descriptor,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
