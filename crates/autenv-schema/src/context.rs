//! Per-run context: resolved ALM connection and the work to perform.

use crate::parameter::ParameterDescriptor;
use crate::types::{ConfigurationId, EnvironmentId, FolderId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolved connection details for one ALM server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlmConnection {
    pub server_url: String,
    pub domain: String,
    pub project: String,
    pub username: String,
    /// Credential for `username`; never logged.
    #[serde(skip_serializing)]
    pub password: String,
}

impl AlmConnection {
    pub fn new(
        server_url: &str,
        domain: impl Into<String>,
        project: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_owned(),
            domain: domain.into(),
            project: project.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Whether to reuse an existing remote configuration or create a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationRequest {
    /// Use this configuration id verbatim, without a remote existence check.
    UseExisting(ConfigurationId),
    /// Create a new configuration under the AUT environment, with this name.
    CreateNew { name: String },
}

/// Everything one orchestration run needs, owned by the caller for the
/// duration of one build and read-only to the core.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    pub connection: AlmConnection,
    pub environment_id: EnvironmentId,
    pub request: ConfigurationRequest,
    /// Optional JSON document feeding `External` parameters.
    pub json_source: Option<PathBuf>,
    /// Ordered parameter descriptors for the target configuration.
    pub parameters: Vec<ParameterDescriptor>,
}

/// Remote identities discovered during configuration selection.
///
/// `configuration_id` is the one externally observable output of the whole
/// workflow; `parameters_folder_id` scopes where parameter values live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteConfigurationHandle {
    pub configuration_id: ConfigurationId,
    pub parameters_folder_id: FolderId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_strips_trailing_slash() {
        let conn = AlmConnection::new("http://alm.example.com:8080/", "DEF", "PRJ", "u", "p");
        assert_eq!(conn.server_url, "http://alm.example.com:8080");
    }

    #[test]
    fn connection_password_not_serialized() {
        let conn = AlmConnection::new("http://alm", "DEF", "PRJ", "u", "secret");
        let json = serde_json::to_string(&conn).unwrap();
        assert!(!json.contains("secret"));
    }
}
