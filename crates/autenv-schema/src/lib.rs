//! Data model and job-file parsing for autenv.
//!
//! This crate defines the schema layer: typed string identifiers
//! (`EnvironmentId`, `ConfigurationId`, `FolderId`), the parameter model
//! (`ParameterDescriptor`, `ParameterKind`, `ResolvedParameter`), the build
//! environment provider with `${VAR}` macro expansion (`BuildEnv`), the
//! per-run context handed to the core (`EnvironmentContext`), and TOML job
//! file parsing (`JobV1`).

pub mod context;
pub mod env;
pub mod job;
pub mod parameter;
pub mod types;

pub use context::{
    AlmConnection, ConfigurationRequest, EnvironmentContext, RemoteConfigurationHandle,
};
pub use env::BuildEnv;
pub use job::{parse_job_file, parse_job_str, JobError, JobV1};
pub use parameter::{ParameterDescriptor, ParameterKind, ResolvedParameter};
pub use types::{ConfigurationId, EnvironmentId, FolderId};
