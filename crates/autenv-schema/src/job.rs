//! TOML job file parsing and validation.
//!
//! A job file describes one publication run: the ALM connection, the target
//! AUT environment, the configuration to reuse or create, and the parameter
//! descriptors. `JobV1::into_context` materializes the validated
//! [`EnvironmentContext`] the core consumes.

use crate::context::{AlmConnection, ConfigurationRequest, EnvironmentContext};
use crate::parameter::{ParameterDescriptor, ParameterKind};
use crate::types::{ConfigurationId, EnvironmentId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to read job file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse job file: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported job_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("alm.{0} must not be empty")]
    EmptyConnectionField(&'static str),
    #[error("no credential: set alm.password or alm.password_env")]
    MissingCredential,
    #[error("credential variable '{0}' is not set in the process environment")]
    CredentialVarUnset(String),
    #[error("environment.aut_environment_id must not be empty")]
    EmptyEnvironmentId,
    #[error("configuration must set exactly one of use_existing / create_new")]
    AmbiguousConfiguration,
    #[error("configuration.{0} must not be empty")]
    EmptyConfigurationField(&'static str),
    #[error("parameter name must not be empty")]
    EmptyParameterName,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JobV1 {
    pub job_version: u32,
    pub alm: AlmSection,
    pub environment: EnvironmentSection,
    #[serde(default)]
    pub configuration: ConfigurationSection,
    #[serde(default, rename = "parameter")]
    pub parameters: Vec<ParameterEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AlmSection {
    pub server_url: String,
    pub domain: String,
    pub project: String,
    pub username: String,
    /// Inline credential. Prefer `password_env` so the job file stays shareable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Name of a process environment variable holding the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSection {
    pub aut_environment_id: String,
    /// Path to the JSON document feeding `external` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_existing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_new: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ParameterEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub kind: ParameterKind,
    #[serde(default)]
    pub first_value_only: bool,
}

pub fn parse_job_str(content: &str) -> Result<JobV1, JobError> {
    let job: JobV1 = toml::from_str(content)?;
    if job.job_version != 1 {
        return Err(JobError::UnsupportedVersion(job.job_version));
    }
    Ok(job)
}

pub fn parse_job_file(path: &Path) -> Result<JobV1, JobError> {
    let content = fs::read_to_string(path)?;
    parse_job_str(&content)
}

impl JobV1 {
    /// Validate the job and build the per-run context.
    ///
    /// Credential lookup order: inline `password`, then the process
    /// environment variable named by `password_env`.
    pub fn into_context(self) -> Result<EnvironmentContext, JobError> {
        for (field, value) in [
            ("server_url", &self.alm.server_url),
            ("domain", &self.alm.domain),
            ("project", &self.alm.project),
            ("username", &self.alm.username),
        ] {
            if value.trim().is_empty() {
                return Err(JobError::EmptyConnectionField(field));
            }
        }

        let password = match (&self.alm.password, &self.alm.password_env) {
            (Some(p), _) => p.clone(),
            (None, Some(var)) => {
                std::env::var(var).map_err(|_| JobError::CredentialVarUnset(var.clone()))?
            }
            (None, None) => return Err(JobError::MissingCredential),
        };

        if self.environment.aut_environment_id.trim().is_empty() {
            return Err(JobError::EmptyEnvironmentId);
        }

        let request = match (
            &self.configuration.use_existing,
            &self.configuration.create_new,
        ) {
            (Some(id), None) => {
                if id.trim().is_empty() {
                    return Err(JobError::EmptyConfigurationField("use_existing"));
                }
                ConfigurationRequest::UseExisting(ConfigurationId::new(id.clone()))
            }
            (None, Some(name)) => {
                if name.trim().is_empty() {
                    return Err(JobError::EmptyConfigurationField("create_new"));
                }
                ConfigurationRequest::CreateNew { name: name.clone() }
            }
            _ => return Err(JobError::AmbiguousConfiguration),
        };

        let mut parameters = Vec::with_capacity(self.parameters.len());
        for entry in &self.parameters {
            if entry.name.trim().is_empty() {
                return Err(JobError::EmptyParameterName);
            }
            parameters.push(
                ParameterDescriptor::new(entry.name.clone(), entry.value.clone(), entry.kind)
                    .first_value_only(entry.first_value_only),
            );
        }

        Ok(EnvironmentContext {
            connection: AlmConnection::new(
                &self.alm.server_url,
                self.alm.domain.clone(),
                self.alm.project.clone(),
                self.alm.username.clone(),
                password,
            ),
            environment_id: EnvironmentId::new(self.environment.aut_environment_id.clone()),
            request,
            json_source: self.environment.json_source.clone(),
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_JOB: &str = r#"
job_version = 1

[alm]
server_url = "http://alm.example.com:8080/"
domain = "DEFAULT"
project = "DEMO"
username = "builder"
password = "secret"

[environment]
aut_environment_id = "1001"
json_source = "params.json"

[configuration]
create_new = "nightly"

[[parameter]]
name = "Browser"
value = "Chrome"
kind = "user-defined"

[[parameter]]
name = "Url"
value = "APP_URL"
kind = "environment"

[[parameter]]
name = "Creds"
kind = "external"
first_value_only = true
"#;

    #[test]
    fn parse_and_materialize_context() {
        let job = parse_job_str(GOOD_JOB).unwrap();
        let ctx = job.into_context().unwrap();

        assert_eq!(ctx.connection.server_url, "http://alm.example.com:8080");
        assert_eq!(ctx.environment_id, "1001");
        assert_eq!(
            ctx.request,
            ConfigurationRequest::CreateNew {
                name: "nightly".to_owned()
            }
        );
        assert_eq!(ctx.parameters.len(), 3);
        assert_eq!(ctx.parameters[0].kind, ParameterKind::UserDefined);
        assert!(ctx.parameters[2].first_value_only);
    }

    #[test]
    fn unsupported_version_rejected() {
        let err = parse_job_str(&GOOD_JOB.replace("job_version = 1", "job_version = 2"))
            .unwrap_err();
        assert!(matches!(err, JobError::UnsupportedVersion(2)));
    }

    #[test]
    fn unknown_field_rejected() {
        let bad = GOOD_JOB.replace("[environment]", "[environment]\nsurprise = true");
        assert!(matches!(
            parse_job_str(&bad).unwrap_err(),
            JobError::ParseToml(_)
        ));
    }

    #[test]
    fn both_configuration_choices_rejected() {
        let bad = GOOD_JOB.replace(
            "create_new = \"nightly\"",
            "create_new = \"nightly\"\nuse_existing = \"2002\"",
        );
        let err = parse_job_str(&bad).unwrap().into_context().unwrap_err();
        assert!(matches!(err, JobError::AmbiguousConfiguration));
    }

    #[test]
    fn neither_configuration_choice_rejected() {
        let bad = GOOD_JOB.replace("create_new = \"nightly\"", "");
        let err = parse_job_str(&bad).unwrap().into_context().unwrap_err();
        assert!(matches!(err, JobError::AmbiguousConfiguration));
    }

    #[test]
    fn empty_parameter_name_rejected() {
        let bad = GOOD_JOB.replace("name = \"Browser\"", "name = \"  \"");
        let err = parse_job_str(&bad).unwrap().into_context().unwrap_err();
        assert!(matches!(err, JobError::EmptyParameterName));
    }

    #[test]
    fn missing_credential_rejected() {
        let bad = GOOD_JOB.replace("password = \"secret\"", "");
        let err = parse_job_str(&bad).unwrap().into_context().unwrap_err();
        assert!(matches!(err, JobError::MissingCredential));
    }

    #[test]
    fn unknown_kind_string_folds_to_undefined() {
        let job = parse_job_str(&GOOD_JOB.replace("\"external\"", "\"from-yaml\"")).unwrap();
        let ctx = job.into_context().unwrap();
        assert_eq!(ctx.parameters[2].kind, ParameterKind::Undefined);
    }

    #[test]
    fn parse_job_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        fs::write(&path, GOOD_JOB).unwrap();
        let job = parse_job_file(&path).unwrap();
        assert_eq!(job.environment.aut_environment_id, "1001");
    }
}
