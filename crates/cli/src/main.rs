//! shelfsync
//!
//! Drives zero-downtime rebuilds of catalog search collections against a
//! Typesense node.

mod commands;
mod config;
mod source;

use std::sync::Arc;

use clap::Parser;
use shelfsync_index::backends::typesense::TypesenseClient;
use tracing::info;

use config::{Cli, init_logging};

async fn run(cli: Cli) -> anyhow::Result<()> {
    let index_config = cli.index_config();
    let client = TypesenseClient::new(&index_config)?;
    info!(
        engine = %client.base_url(),
        site = %index_config.site,
        "Connecting to search engine"
    );

    let output = cli.command.execute(Arc::new(client), &index_config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(errors) = cli.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}
