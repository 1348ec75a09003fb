//! # Accuracy CLI Binary

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, CliHandler};
use tracing_subscriber::EnvFilter;

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the JSON report can be piped
    init_logging(cli.json_logs);

    let handler = CliHandler::new()?;
    handler.handle_command(cli.command).await?;

    Ok(())
}
