//! Resolution and orchestration pipeline for AUT Environment Configurations.
//!
//! This crate ties together the schema layer and the ALM client into the
//! `Engine` — authenticate, select or create the remote configuration,
//! resolve every parameter from its source, push only the values that
//! changed, and surface the resulting configuration id. Partial parameter
//! failures are reported, never escalated, once a configuration is selected.

pub mod concurrency;
pub mod delta;
pub mod engine;
pub mod lifecycle;
pub mod resolver;
pub mod selector;

pub use concurrency::ConfigLock;
pub use delta::{resolve_and_apply, DeltaReport, RejectedParameter, SkippedParameter};
pub use engine::{Engine, RunOutcome};
pub use lifecycle::{validate_transition, WorkflowState};
pub use resolver::{resolve, JsonSource, LocalReader, ResolveError, SourceReader};
pub use selector::select_configuration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),
    #[error("there is no AUT Environment Configuration in order to proceed")]
    NoConfigurationAvailable,
    #[error("client error: {0}")]
    Client(#[from] autenv_client::ClientError),
    #[error("job error: {0}")]
    Job(#[from] autenv_schema::JobError),
    #[error("invalid workflow transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
