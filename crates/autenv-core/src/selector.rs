//! Remote configuration identity: reuse an existing configuration or create
//! a new one, and discover the parameters root folder.

use crate::CoreError;
use autenv_client::{AlmClient, Session};
use autenv_schema::{ConfigurationRequest, EnvironmentContext, RemoteConfigurationHandle};
use tracing::{debug, info};

/// Decide the remote configuration to work against.
///
/// Requires an authenticated session. The folder lookup fails fatally when
/// the AUT environment id does not exist remotely. An explicitly selected
/// existing configuration id is taken verbatim, without a remote existence
/// check — a bogus id surfaces naturally on the downstream update call.
/// An empty id from either branch is a fatal gate: every subsequent remote
/// parameter call needs a valid configuration id as context.
pub fn select_configuration(
    client: &dyn AlmClient,
    session: &Session,
    context: &EnvironmentContext,
) -> Result<RemoteConfigurationHandle, CoreError> {
    let parameters_folder_id = client.parameters_folder_id(session, &context.environment_id)?;
    debug!(
        "parameters root folder of AUT environment '{}' is '{parameters_folder_id}'",
        context.environment_id
    );

    let configuration_id = match &context.request {
        ConfigurationRequest::UseExisting(id) => {
            info!("reusing existing configuration '{id}'");
            id.clone()
        }
        ConfigurationRequest::CreateNew { name } => {
            let id = client.create_configuration(session, &context.environment_id, name)?;
            info!("created configuration '{id}' named '{name}'");
            id
        }
    };

    if configuration_id.trim().is_empty() {
        return Err(CoreError::NoConfigurationAvailable);
    }

    Ok(RemoteConfigurationHandle {
        configuration_id,
        parameters_folder_id,
    })
}
