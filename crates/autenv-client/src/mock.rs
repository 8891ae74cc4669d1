//! In-memory mock ALM client for tests and dry runs.

use crate::{AlmClient, ClientError, Session, UpdateOutcome};
use autenv_schema::{AlmConnection, ConfigurationId, EnvironmentId, FolderId};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct MockState {
    /// env_id -> parameters folder id
    environments: BTreeMap<String, String>,
    /// configuration id -> stored parameter values
    configurations: BTreeMap<String, BTreeMap<String, String>>,
    /// parameter name -> rejection reason for update calls
    reject_names: BTreeMap<String, String>,
    /// parameter name -> simulated transport failure for read calls
    fail_read_names: BTreeMap<String, String>,
    fail_auth: bool,
    create_returns_empty: bool,
    fail_updates: bool,
    create_calls: usize,
    auth_calls: usize,
    next_conf: u32,
}

/// Scriptable in-memory stand-in for a remote ALM server.
pub struct MockAlmClient {
    state: Mutex<MockState>,
}

impl Default for MockAlmClient {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }
}

impl MockAlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>, ClientError> {
        self.state
            .lock()
            .map_err(|e| ClientError::Http(format!("mutex poisoned: {e}")))
    }

    #[must_use]
    pub fn with_environment(self, env_id: &str, folder_id: &str) -> Self {
        {
            let mut state = self.state.lock().expect("mock state");
            state
                .environments
                .insert(env_id.to_owned(), folder_id.to_owned());
        }
        self
    }

    /// Seed an existing configuration with stored values.
    pub fn seed_configuration(&self, conf_id: &str, values: &[(&str, &str)]) {
        let mut state = self.state.lock().expect("mock state");
        let map = values
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        state.configurations.insert(conf_id.to_owned(), map);
    }

    pub fn fail_authentication(&self) {
        self.state.lock().expect("mock state").fail_auth = true;
    }

    /// Make `create_configuration` answer with an empty id.
    pub fn create_returns_empty_id(&self) {
        self.state.lock().expect("mock state").create_returns_empty = true;
    }

    /// Reject updates of the named parameter with the given reason.
    pub fn reject_parameter(&self, name: &str, reason: &str) {
        self.state
            .lock()
            .expect("mock state")
            .reject_names
            .insert(name.to_owned(), reason.to_owned());
    }

    /// Simulate a transport failure when reading the named parameter.
    pub fn fail_parameter_read(&self, name: &str, reason: &str) {
        self.state
            .lock()
            .expect("mock state")
            .fail_read_names
            .insert(name.to_owned(), reason.to_owned());
    }

    /// Simulate a transport failure of the whole batched update call.
    pub fn fail_updates(&self) {
        self.state.lock().expect("mock state").fail_updates = true;
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().expect("mock state").create_calls
    }

    pub fn auth_calls(&self) -> usize {
        self.state.lock().expect("mock state").auth_calls
    }

    /// Stored values of a configuration, empty if unknown.
    pub fn stored_values(&self, conf_id: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .expect("mock state")
            .configurations
            .get(conf_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl AlmClient for MockAlmClient {
    fn authenticate(&self, connection: &AlmConnection) -> Result<Session, ClientError> {
        let mut state = self.lock()?;
        state.auth_calls += 1;
        if state.fail_auth {
            return Err(ClientError::Unauthorized(connection.username.clone()));
        }
        Ok(Session::new(format!("mock-session-{}", state.auth_calls)))
    }

    fn parameters_folder_id(
        &self,
        _session: &Session,
        environment_id: &EnvironmentId,
    ) -> Result<FolderId, ClientError> {
        let state = self.lock()?;
        state
            .environments
            .get(environment_id.as_str())
            .map(FolderId::new)
            .ok_or_else(|| ClientError::NotFound(format!("AUT environment '{environment_id}'")))
    }

    fn create_configuration(
        &self,
        _session: &Session,
        environment_id: &EnvironmentId,
        _name: &str,
    ) -> Result<ConfigurationId, ClientError> {
        let mut state = self.lock()?;
        state.create_calls += 1;
        if !state.environments.contains_key(environment_id.as_str()) {
            return Err(ClientError::NotFound(format!(
                "AUT environment '{environment_id}'"
            )));
        }
        if state.create_returns_empty {
            return Ok(ConfigurationId::new(""));
        }
        state.next_conf += 1;
        let id = format!("conf_{}", state.next_conf);
        state.configurations.insert(id.clone(), BTreeMap::new());
        Ok(ConfigurationId::new(id))
    }

    fn parameter_values(
        &self,
        _session: &Session,
        configuration_id: &ConfigurationId,
        _folder_id: &FolderId,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let state = self.lock()?;
        Ok(state
            .configurations
            .get(configuration_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn parameter_value(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
        name: &str,
    ) -> Result<Option<String>, ClientError> {
        {
            let state = self.lock()?;
            if let Some(reason) = state.fail_read_names.get(name) {
                return Err(ClientError::Http(reason.clone()));
            }
        }
        Ok(self
            .parameter_values(session, configuration_id, folder_id)?
            .remove(name))
    }

    fn set_parameter_values(
        &self,
        _session: &Session,
        configuration_id: &ConfigurationId,
        _folder_id: &FolderId,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<UpdateOutcome>, ClientError> {
        let mut state = self.lock()?;
        if state.fail_updates {
            return Err(ClientError::Http("simulated update outage".to_owned()));
        }
        if !state.configurations.contains_key(configuration_id.as_str()) {
            // Reuse of a bogus configuration id surfaces here, not earlier.
            return Ok(values
                .keys()
                .map(|name| {
                    UpdateOutcome::rejected(
                        name,
                        format!("unknown configuration '{configuration_id}'"),
                    )
                })
                .collect());
        }

        let rejections = state.reject_names.clone();
        let stored = state
            .configurations
            .get_mut(configuration_id.as_str())
            .expect("checked above");

        let mut outcomes = Vec::with_capacity(values.len());
        for (name, value) in values {
            if let Some(reason) = rejections.get(name) {
                outcomes.push(UpdateOutcome::rejected(name, reason.clone()));
            } else {
                stored.insert(name.clone(), value.clone());
                outcomes.push(UpdateOutcome::accepted(name));
            }
        }
        Ok(outcomes)
    }
}
