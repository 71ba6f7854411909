use anyhow::{Context, Result};
use clap::Parser;
use pr_config::Config;
use pr_core::recipe::BasicRecipe;
use pr_local::LocalReviewManager;
use pr_orchestrator::Orchestrator;
use pr_progress::Bus;
use pr_store::Store;
use std::sync::Arc;

mod cli;
mod doctor;
#[cfg(test)]
mod tests;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config_path = pr_config::paths::config_file_path()
        .context("could not resolve a config directory for this platform")?;
    let config = Config::load(&config_path)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Doctor => doctor::run(&config),
        Commands::Serve { port } => serve(config, port).await,
    }
}

/// Wires the store, provider registry, orchestrator, and local-review
/// manager into the shared state the HTTP router needs. Split out from
/// [`serve`] so tests can build it against an in-memory store.
fn build_state(config: &Config, store: Store) -> pr_http::AppState {
    let registry = Arc::new(pr_config::ProviderRegistry::from_config(config));
    let bus = Bus::new();
    let orchestrator =
        Orchestrator::new(store.clone(), bus.clone(), registry, Arc::new(BasicRecipe)).with_yolo(config.yolo);
    let local = LocalReviewManager::new(store.clone());
    pr_http::AppState::new(store, bus, orchestrator, local)
}

async fn serve(config: Config, port_override: Option<u16>) -> Result<()> {
    let store_path =
        pr_config::paths::store_file_path().context("could not resolve a state directory for this platform")?;
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Store::open(&store_path)?;
    let state = build_state(&config, store);

    let port = port_override.unwrap_or(config.port);
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "pair-review listening");

    axum::serve(listener, pr_http::router(state)).await?;
    Ok(())
}
