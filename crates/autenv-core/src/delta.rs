//! Resolve every parameter, compute the minimal delta against remote state,
//! and apply the update set.
//!
//! Per-parameter failures are scoped: a parameter that cannot be resolved or
//! read is skipped with a reason, and a rejected update is recorded, but the
//! batch always runs to completion. One bad parameter must not block the
//! others from being applied.

use crate::concurrency::ConfigLock;
use crate::resolver::{self, JsonSource, SourceReader};
use crate::CoreError;
use autenv_client::{AlmClient, Session};
use autenv_schema::{
    BuildEnv, ParameterDescriptor, ParameterKind, RemoteConfigurationHandle, ResolvedParameter,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A parameter that never reached the update set, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedParameter {
    pub name: String,
    pub reason: String,
}

/// A parameter the remote system refused to update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedParameter {
    pub name: String,
    pub reason: String,
}

/// Per-run account of what happened to every parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeltaReport {
    /// Names whose new value the remote accepted.
    pub applied: Vec<String>,
    /// Names whose remote value already matched; not pushed.
    pub unchanged: Vec<String>,
    pub skipped: Vec<SkippedParameter>,
    pub rejected: Vec<RejectedParameter>,
}

impl DeltaReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// True when every parameter either applied cleanly or was unchanged.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.rejected.is_empty()
    }
}

/// Resolve all descriptors for a configuration and push the values that
/// actually changed. `node` is the build agent name, used only for log
/// correlation.
#[allow(clippy::too_many_arguments)]
pub fn resolve_and_apply(
    client: &dyn AlmClient,
    session: &Session,
    handle: &RemoteConfigurationHandle,
    descriptors: &[ParameterDescriptor],
    build_env: &BuildEnv,
    json_path: Option<&Path>,
    reader: &dyn SourceReader,
    node: Option<&str>,
) -> Result<DeltaReport, CoreError> {
    let mut report = DeltaReport::default();

    if descriptors.is_empty() {
        info!("there are no AUT Environment parameters to assign for this build");
        return Ok(report);
    }
    debug!(
        "resolving {} parameter(s) for configuration '{}' (node: {})",
        descriptors.len(),
        handle.configuration_id,
        node.unwrap_or("unknown"),
    );

    // The JSON document is read at most once, and only when an external
    // parameter actually needs it. A load failure scopes to those parameters.
    let needs_document = descriptors
        .iter()
        .any(|d| d.kind == ParameterKind::External);
    let (json_source, document_failure) = if needs_document {
        match json_path {
            Some(path) => match JsonSource::load(path, reader) {
                Ok(source) => (Some(source), None),
                Err(e) => {
                    warn!("external parameter source unavailable: {e}");
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        }
    } else {
        (None, None)
    };

    let mut resolved = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if descriptor.kind == ParameterKind::External {
            if let Some(reason) = &document_failure {
                report.skipped.push(SkippedParameter {
                    name: descriptor.name.clone(),
                    reason: reason.clone(),
                });
                continue;
            }
        }
        match resolver::resolve(descriptor, build_env, json_source.as_ref()) {
            Ok(value) => resolved.push(ResolvedParameter::new(descriptor.clone(), value)),
            Err(e) => {
                warn!("parameter '{}' failed to resolve: {e}", descriptor.name);
                report.skipped.push(SkippedParameter {
                    name: descriptor.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // Diff against the remotely stored values; only changed values are
    // pushed, bounding write traffic and remote audit churn. A read failure
    // is scoped to its parameter.
    let mut to_update: BTreeMap<String, String> = BTreeMap::new();
    for parameter in &resolved {
        match client.parameter_value(
            session,
            &handle.configuration_id,
            &handle.parameters_folder_id,
            parameter.name(),
        ) {
            Ok(current) => {
                if current.as_deref() == Some(parameter.value.as_str()) {
                    debug!("parameter '{}' is unchanged", parameter.name());
                    report.unchanged.push(parameter.name().to_owned());
                } else {
                    to_update.insert(parameter.name().to_owned(), parameter.value.clone());
                }
            }
            Err(e) => {
                warn!(
                    "could not read current value of parameter '{}': {e}",
                    parameter.name()
                );
                report.skipped.push(SkippedParameter {
                    name: parameter.name().to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if to_update.is_empty() {
        info!("no parameter values changed; nothing to update");
        return Ok(report);
    }

    // Writers racing on the same remote configuration serialize here.
    let _guard = ConfigLock::acquire(handle.configuration_id.as_str());
    match client.set_parameter_values(
        session,
        &handle.configuration_id,
        &handle.parameters_folder_id,
        &to_update,
    ) {
        Ok(outcomes) => {
            let mut answered: Vec<&str> = Vec::with_capacity(outcomes.len());
            for outcome in &outcomes {
                answered.push(&outcome.name);
                if outcome.accepted {
                    report.applied.push(outcome.name.clone());
                } else {
                    let reason = outcome
                        .reason
                        .clone()
                        .unwrap_or_else(|| "rejected by the remote system".to_owned());
                    warn!("parameter '{}' rejected: {reason}", outcome.name);
                    report.rejected.push(RejectedParameter {
                        name: outcome.name.clone(),
                        reason,
                    });
                }
            }
            // A parameter the remote did not answer for must not vanish
            // from the report.
            for name in to_update.keys() {
                if !answered.contains(&name.as_str()) {
                    report.rejected.push(RejectedParameter {
                        name: name.clone(),
                        reason: "no outcome reported by the remote system".to_owned(),
                    });
                }
            }
        }
        Err(e) => {
            warn!("parameter update call failed: {e}");
            for name in to_update.keys() {
                report.rejected.push(RejectedParameter {
                    name: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "assigned values to AUT Environment parameters: {} applied, {} unchanged, {} skipped, {} rejected",
        report.applied.len(),
        report.unchanged.len(),
        report.skipped.len(),
        report.rejected.len(),
    );
    Ok(report)
}
