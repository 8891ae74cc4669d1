//! Top-level orchestration of one publication run.

use crate::lifecycle::{validate_transition, WorkflowState};
use crate::resolver::{LocalReader, SourceReader};
use crate::{delta, selector, CoreError, DeltaReport};
use autenv_client::AlmClient;
use autenv_schema::{BuildEnv, ConfigurationId, EnvironmentContext};
use serde::Serialize;
use tracing::{debug, error, info};

/// Central orchestration engine for one AUT Environment Configuration run.
///
/// Drives authenticate → select → resolve/update in strict order; each
/// stage's output is an input to the next. The engine owns its client, so a
/// session is never shared across concurrent builds.
pub struct Engine {
    client: Box<dyn AlmClient>,
    reader: Box<dyn SourceReader>,
}

/// Result of a completed run. `configuration_id` is the only field
/// downstream build steps may rely on; the report is diagnostic.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub configuration_id: ConfigurationId,
    pub report: DeltaReport,
    pub completed_at: String,
}

impl Engine {
    pub fn new(client: Box<dyn AlmClient>) -> Self {
        Self {
            client,
            reader: Box::new(LocalReader),
        }
    }

    /// Replace the filesystem seam used for the external JSON source.
    #[must_use]
    pub fn with_reader(mut self, reader: Box<dyn SourceReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Run the whole workflow and surface the resulting configuration id.
    ///
    /// Authentication and configuration selection failures are fatal.
    /// Partial parameter failures are carried in the outcome's report; the
    /// run still completes, since the configuration itself was selected.
    pub fn run(
        &self,
        context: &EnvironmentContext,
        build_env: &BuildEnv,
    ) -> Result<RunOutcome, CoreError> {
        self.run_inner(context, build_env).map_err(|e| {
            error!("failed to update the AUT Environment Configuration: {e}");
            e
        })
    }

    fn run_inner(
        &self,
        context: &EnvironmentContext,
        build_env: &BuildEnv,
    ) -> Result<RunOutcome, CoreError> {
        let mut state = WorkflowState::Start;

        state = advance(state, WorkflowState::Authenticating)?;
        info!(
            "authenticating '{}' against {}",
            context.connection.username, context.connection.server_url
        );
        let session = match self.client.authenticate(&context.connection) {
            Ok(session) => session,
            Err(e) => {
                fail(state);
                return Err(CoreError::AuthenticationFailure(e.to_string()));
            }
        };

        state = advance(state, WorkflowState::Selecting)?;
        let handle = selector::select_configuration(self.client.as_ref(), &session, context)
            .map_err(|e| {
                fail(state);
                e
            })?;

        state = advance(state, WorkflowState::Updating)?;
        let node = build_env.get("NODE_NAME");
        let report = delta::resolve_and_apply(
            self.client.as_ref(),
            &session,
            &handle,
            &context.parameters,
            build_env,
            context.json_source.as_deref(),
            self.reader.as_ref(),
            node,
        )
        .map_err(|e| {
            fail(state);
            e
        })?;

        advance(state, WorkflowState::Done)?;
        info!(
            "AUT Environment Configuration '{}' is ready",
            handle.configuration_id
        );
        Ok(RunOutcome {
            configuration_id: handle.configuration_id,
            report,
            completed_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

fn advance(from: WorkflowState, to: WorkflowState) -> Result<WorkflowState, CoreError> {
    validate_transition(from, to)?;
    debug!("workflow state: {from} -> {to}");
    Ok(to)
}

fn fail(from: WorkflowState) -> WorkflowState {
    // Failed is reachable from every non-terminal state, so this never
    // masks the error being propagated alongside it.
    match advance(from, WorkflowState::Failed) {
        Ok(state) => state,
        Err(e) => {
            error!("workflow bookkeeping error: {e}");
            from
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_edge_goes_through_the_transition_table() {
        for state in [
            WorkflowState::Authenticating,
            WorkflowState::Selecting,
            WorkflowState::Updating,
        ] {
            assert_eq!(fail(state), WorkflowState::Failed);
        }
        // Terminal states reject the edge instead of silently moving.
        assert_eq!(fail(WorkflowState::Done), WorkflowState::Done);
    }
}
