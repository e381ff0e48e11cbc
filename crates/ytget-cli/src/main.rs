mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "ytget=error",
        (false, 0) => "ytget=info",
        (false, 1) => "ytget=debug",
        (false, 2) => "ytget=trace",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = cli.config.as_deref();

    // Handle commands
    match cli.command {
        Some(Commands::Get { urls, options }) => {
            commands::get::run(&urls, &options, config, cli.quiet).await
        }
        Some(Commands::Batch { input, options }) => {
            commands::batch::run(&input, &options, config, cli.quiet).await
        }
        Some(Commands::Formats { url, files, json }) => {
            commands::formats::run(&url, files, json, config).await
        }
        Some(Commands::Doctor) => commands::doctor::run(config).await,
        Some(Commands::Config) => commands::config::run(config).await,
        // Bare URLs (or none, to be asked for) are a `get`
        None => commands::get::run(&cli.urls, &cli.options, config, cli.quiet).await,
    }
}
