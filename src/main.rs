use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{ConfigCommand, CopyCommand, DeleteCommand, ListCommand};
use larder::{Config, Store};

#[derive(Parser)]
#[command(name = "larder")]
#[command(version)]
#[command(about = "Inspect and maintain Larder storage", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(ConfigCommand),

    /// Print every record of a collection
    List(ListCommand),

    /// Delete one record from a collection
    Delete(DeleteCommand),

    /// Copy every collection into another backend
    Copy(CopyCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;
    let providers = Arc::new(config.registry());

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let store = Store::open(&config.backend(), providers.clone()).await?;
    let result = match &command {
        Commands::List(cmd) => cmd.run(&store).await,
        Commands::Delete(cmd) => cmd.run(&store).await,
        Commands::Copy(cmd) => cmd.run(&store, &config, providers).await,
        Commands::Config(_) => Ok(()),
    };
    store.close().await?;

    result
}
