use super::{colorize_outcome, json_pretty, load_context, EXIT_SUCCESS};
use autenv_core::{JsonSource, LocalReader};
use autenv_schema::{BuildEnv, ParameterKind};
use std::path::Path;

/// Resolve every parameter locally and show what a run would push, without
/// contacting the ALM server.
pub fn run(job: &Path, json: bool) -> Result<u8, String> {
    let context = load_context(job)?;
    let build_env = BuildEnv::from_process();

    let needs_source = context
        .parameters
        .iter()
        .any(|p| p.kind == ParameterKind::External);
    let source = if needs_source {
        match context.json_source.as_deref() {
            Some(path) => match JsonSource::load(path, &LocalReader) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("external source unavailable: {e}");
                    None
                }
            },
            None => None,
        }
    } else {
        None
    };

    let mut rows = Vec::new();
    for descriptor in &context.parameters {
        match autenv_core::resolve(descriptor, &build_env, source.as_ref()) {
            Ok(value) => rows.push((descriptor, Ok(value))),
            Err(e) => rows.push((descriptor, Err(e.to_string()))),
        }
    }

    if json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(d, r)| {
                serde_json::json!({
                    "name": d.name,
                    "kind": d.kind.to_string(),
                    "value": r.as_ref().ok(),
                    "error": r.as_ref().err(),
                })
            })
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else if rows.is_empty() {
        println!("no parameters defined");
    } else {
        println!("{:<24} {:<14} VALUE", "NAME", "KIND");
        for (descriptor, resolved) in &rows {
            match resolved {
                Ok(value) => println!("{:<24} {:<14} {value}", descriptor.name, descriptor.kind),
                Err(reason) => println!(
                    "{:<24} {:<14} {} ({reason})",
                    descriptor.name,
                    descriptor.kind,
                    colorize_outcome("skipped"),
                ),
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
