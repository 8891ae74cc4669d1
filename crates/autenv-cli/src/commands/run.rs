use super::{json_pretty, load_context, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use autenv_client::{ClientConfig, HttpAlmClient};
use autenv_core::Engine;
use autenv_schema::BuildEnv;
use std::path::Path;

pub fn run(job: &Path, timeout: u64, json: bool) -> Result<u8, String> {
    let context = load_context(job)?;
    let build_env = BuildEnv::from_process();

    let config = ClientConfig::new(&context.connection.server_url).with_timeout_secs(timeout);
    let engine = Engine::new(Box::new(HttpAlmClient::new(&config)));

    let pb = spinner("publishing configuration…");
    let outcome = engine.run(&context, &build_env).map_err(|e| {
        spin_fail(&pb, "publication failed");
        e.to_string()
    })?;
    spin_ok(&pb, "publication complete");

    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        println!("configuration id: {}", outcome.configuration_id);
        println!(
            "{} applied, {} unchanged, {} skipped, {} rejected",
            outcome.report.applied.len(),
            outcome.report.unchanged.len(),
            outcome.report.skipped.len(),
            outcome.report.rejected.len(),
        );
        for skipped in &outcome.report.skipped {
            println!("  skipped {}: {}", skipped.name, skipped.reason);
        }
        for rejected in &outcome.report.rejected {
            println!("  rejected {}: {}", rejected.name, rejected.reason);
        }
    }
    Ok(EXIT_SUCCESS)
}
