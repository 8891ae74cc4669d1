//! Build environment provider: variable lookup and `${VAR}` macro expansion.

use std::collections::BTreeMap;

/// The set of build environment variables visible to one workflow run.
///
/// Expansion leaves unresolved `${VAR}` placeholders as literal text; a
/// missing variable is never an error here. Lookup misses are the caller's
/// policy to handle (the resolver treats them as an empty value).
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Expand `${VAR}` (and `$VAR`) placeholders against this environment.
    /// Unknown variables are left untouched in the output.
    pub fn expand(&self, template: &str) -> String {
        shellexpand::env_with_context_no_errors(template, |var| self.get(var)).into_owned()
    }
}

impl FromIterator<(String, String)> for BuildEnv {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> BuildEnv {
        let mut e = BuildEnv::new();
        e.set("BUILD_NUMBER", "77").set("NODE_NAME", "agent-3");
        e
    }

    #[test]
    fn expand_replaces_known_variables() {
        assert_eq!(env().expand("build-${BUILD_NUMBER}"), "build-77");
        assert_eq!(env().expand("$NODE_NAME"), "agent-3");
    }

    #[test]
    fn expand_leaves_unknown_variables_literal() {
        assert_eq!(env().expand("x-${NO_SUCH_VAR}-y"), "x-${NO_SUCH_VAR}-y");
    }

    #[test]
    fn expand_without_placeholders_is_identity() {
        assert_eq!(env().expand("plain text"), "plain text");
    }

    #[test]
    fn lookup_miss_is_none() {
        assert_eq!(env().get("MISSING"), None);
        assert_eq!(env().get("BUILD_NUMBER"), Some("77"));
    }
}
