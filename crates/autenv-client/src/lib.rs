//! Remote ALM REST boundary for autenv.
//!
//! This crate owns the [`AlmClient`] trait the orchestration core calls,
//! an HTTP implementation ([`HttpAlmClient`]), and an in-memory mock
//! ([`MockAlmClient`]) for tests and dry runs. Sessions are explicit values
//! threaded through every call; there is no process-wide client cache.

pub mod config;
pub mod http;
pub mod mock;

pub use config::ClientConfig;
pub use http::HttpAlmClient;
pub use mock::MockAlmClient;

use autenv_schema::{AlmConnection, ConfigurationId, EnvironmentId, FolderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication rejected for user '{0}'")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque token proving an authenticated ALM session.
///
/// Scoped to one workflow run; never shared across concurrent builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Outcome of one parameter's remote update. The remote system may accept
/// some parameters of a batch and reject others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub name: String,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UpdateOutcome {
    pub fn accepted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// The remote ALM operations the resolution workflow needs.
///
/// Implementations must not hold hidden session state: every call after
/// `authenticate` receives the session explicitly.
pub trait AlmClient: Send + Sync {
    /// Establish a session for the given connection.
    fn authenticate(&self, connection: &AlmConnection) -> Result<Session, ClientError>;

    /// Look up the parameters-root-folder id of an AUT environment.
    fn parameters_folder_id(
        &self,
        session: &Session,
        environment_id: &EnvironmentId,
    ) -> Result<FolderId, ClientError>;

    /// Create a new configuration under an AUT environment.
    fn create_configuration(
        &self,
        session: &Session,
        environment_id: &EnvironmentId,
        name: &str,
    ) -> Result<ConfigurationId, ClientError>;

    /// Read all currently stored parameter values of a configuration.
    fn parameter_values(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
    ) -> Result<BTreeMap<String, String>, ClientError>;

    /// Read one parameter's stored value; `None` when no value is stored yet.
    fn parameter_value(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
        name: &str,
    ) -> Result<Option<String>, ClientError> {
        Ok(self
            .parameter_values(session, configuration_id, folder_id)?
            .remove(name))
    }

    /// Apply new parameter values. One logical operation per parameter: the
    /// remote answers per name, and a rejection of one name does not imply
    /// anything about the others.
    fn set_parameter_values(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<UpdateOutcome>, ClientError>;
}

/// Shared clients delegate; lets callers keep a handle for inspection while
/// the engine owns a `Box<dyn AlmClient>`.
impl<T: AlmClient + ?Sized> AlmClient for std::sync::Arc<T> {
    fn authenticate(&self, connection: &AlmConnection) -> Result<Session, ClientError> {
        (**self).authenticate(connection)
    }

    fn parameters_folder_id(
        &self,
        session: &Session,
        environment_id: &EnvironmentId,
    ) -> Result<FolderId, ClientError> {
        (**self).parameters_folder_id(session, environment_id)
    }

    fn create_configuration(
        &self,
        session: &Session,
        environment_id: &EnvironmentId,
        name: &str,
    ) -> Result<ConfigurationId, ClientError> {
        (**self).create_configuration(session, environment_id, name)
    }

    fn parameter_values(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        (**self).parameter_values(session, configuration_id, folder_id)
    }

    fn parameter_value(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
        name: &str,
    ) -> Result<Option<String>, ClientError> {
        (**self).parameter_value(session, configuration_id, folder_id, name)
    }

    fn set_parameter_values(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<UpdateOutcome>, ClientError> {
        (**self).set_parameter_values(session, configuration_id, folder_id, values)
    }
}
