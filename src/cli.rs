use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gas-ledger", version, about = "Wallet gas expenditure estimator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the gas summary for one address and print it as JSON
    Summary {
        #[arg(long)]
        address: String,
        /// Pretty-print the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Run the HTTP API server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
}
