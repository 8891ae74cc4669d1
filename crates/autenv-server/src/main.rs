use autenv_server::Store;
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "autenv-server", about = "Reference ALM server for autenv")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8321)]
    port: u16,

    /// JSON seed file with users and AUT environments.
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Seed {
    #[serde(default)]
    users: HashMap<String, String>,
    /// AUT environment id -> parameters folder id
    #[serde(default)]
    environments: HashMap<String, String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = Arc::new(Store::new());

    match cli.seed {
        Some(path) => {
            let content = std::fs::read_to_string(&path).expect("failed to read seed file");
            let seed: Seed = serde_json::from_str(&content).expect("invalid seed file");
            for (username, password) in &seed.users {
                store.add_user(username, password);
            }
            for (env_id, folder_id) in &seed.environments {
                store.add_environment(env_id, folder_id);
            }
            info!(
                "seeded {} user(s) and {} environment(s) from {}",
                seed.users.len(),
                seed.environments.len(),
                path.display()
            );
        }
        None => {
            store.add_user("admin", "changeit");
            store.add_environment("1001", "folder_1");
            warn!("no --seed file given; using demo user 'admin' and environment '1001'");
        }
    }

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("starting autenv-server on {addr}");
    autenv_server::run_server(&store, &addr);
}
