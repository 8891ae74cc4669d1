//! Workflow state machine for one orchestration run.

use crate::CoreError;
use std::fmt;

/// States of one publication run. `Done` is the only state a caller may
/// read a configuration id from; `Failed` is reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    Authenticating,
    Selecting,
    Updating,
    Done,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Authenticating => "authenticating",
            Self::Selecting => "selecting",
            Self::Updating => "updating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: WorkflowState, to: WorkflowState) -> Result<(), CoreError> {
    use WorkflowState::{Authenticating, Done, Failed, Selecting, Start, Updating};

    let valid = matches!(
        (from, to),
        (Start, Authenticating)
            | (Authenticating, Selecting)
            | (Selecting, Updating)
            | (Updating, Done)
    ) || (to == Failed && !matches!(from, Done | Failed));

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowState::*;

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(Start, Authenticating).is_ok());
        assert!(validate_transition(Authenticating, Selecting).is_ok());
        assert!(validate_transition(Selecting, Updating).is_ok());
        assert!(validate_transition(Updating, Done).is_ok());
    }

    #[test]
    fn any_non_terminal_state_may_fail() {
        assert!(validate_transition(Start, Failed).is_ok());
        assert!(validate_transition(Authenticating, Failed).is_ok());
        assert!(validate_transition(Selecting, Failed).is_ok());
        assert!(validate_transition(Updating, Failed).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(Start, Selecting).is_err());
        assert!(validate_transition(Start, Done).is_err());
        assert!(validate_transition(Authenticating, Updating).is_err());
        assert!(validate_transition(Selecting, Done).is_err());
        assert!(validate_transition(Done, Failed).is_err());
        assert!(validate_transition(Failed, Failed).is_err());
        assert!(validate_transition(Done, Authenticating).is_err());
    }
}
