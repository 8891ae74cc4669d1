use super::{json_pretty, load_context, EXIT_SUCCESS};
use autenv_schema::ConfigurationRequest;
use std::path::Path;

pub fn run(job: &Path, json: bool) -> Result<u8, String> {
    let context = load_context(job)?;

    let (mode, target) = match &context.request {
        ConfigurationRequest::UseExisting(id) => ("use-existing", id.to_string()),
        ConfigurationRequest::CreateNew { name } => ("create-new", name.clone()),
    };

    if json {
        let payload = serde_json::json!({
            "server_url": context.connection.server_url,
            "domain": context.connection.domain,
            "project": context.connection.project,
            "aut_environment_id": context.environment_id,
            "configuration_mode": mode,
            "configuration_target": target,
            "json_source": context.json_source,
            "parameter_count": context.parameters.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("job file is valid");
        println!(
            "server:        {} ({}/{})",
            context.connection.server_url, context.connection.domain, context.connection.project
        );
        println!("environment:   {}", context.environment_id);
        println!("configuration: {mode} '{target}'");
        if let Some(path) = &context.json_source {
            println!("json source:   {}", path.display());
        }
        println!("parameters:    {}", context.parameters.len());
    }
    Ok(EXIT_SUCCESS)
}
