mod api;
mod cli;
mod router;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pricevault_core::{Config, SymbolSpec};
use pricevault_ingest::Coordinator;

use crate::cli::{Cli, Command};
use crate::state::AppState;

async fn serve(config: Config) -> anyhow::Result<()> {
    let missing = config.missing_required();
    if !missing.is_empty() {
        warn!(?missing, "required settings absent; ingestion requests will be refused");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let coordinator = Coordinator::from_config(config);
    let state = Arc::new(AppState::new(coordinator, SymbolSpec::defaults()));
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ingest(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config);
    let report = coordinator.run(&SymbolSpec::defaults()).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_success() {
        anyhow::bail!("ingestion run {} ended with {:?}", report.run_id, report.overall_status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pricevault_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.resolve() {
        Command::Serve(args) => {
            args.apply(&mut config.server);
            config.log_summary();
            serve(config).await
        }
        Command::Ingest => {
            config.log_summary();
            ingest(config).await
        }
    }
}
