pub mod check;
pub mod completions;
pub mod resolve;
pub mod run;

use autenv_schema::EnvironmentContext;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_JOB_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_outcome(outcome: &str) -> String {
    use console::Style;
    match outcome {
        "applied" => Style::new().green().apply_to(outcome).to_string(),
        "unchanged" => Style::new().dim().apply_to(outcome).to_string(),
        "skipped" => Style::new().yellow().apply_to(outcome).to_string(),
        "rejected" => Style::new().red().bold().apply_to(outcome).to_string(),
        other => other.to_owned(),
    }
}

/// Parse and validate a job file into the per-run context.
pub fn load_context(job: &Path) -> Result<EnvironmentContext, String> {
    autenv_schema::parse_job_file(job)
        .and_then(autenv_schema::JobV1::into_context)
        .map_err(|e| format!("job error: {e}"))
}
