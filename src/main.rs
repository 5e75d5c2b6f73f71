mod cli;

use anyhow::Context;
use clap::Parser;

use gas_ledger::aggregate::GasCostAggregator;
use gas_ledger::api::{self, AppState};
use gas_ledger::config::Config;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let aggregator = GasCostAggregator::from_config(&config)?;

    match cli.command {
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            api::run_http_server(&bind, AppState { aggregator }).await?;
        }
        Commands::Summary { address, pretty } => {
            let result = aggregator
                .compute_gas_summary(&address)
                .await
                .with_context(|| format!("failed to compute gas summary for {}", address))?;
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
