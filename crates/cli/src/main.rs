//! CardVault CLI - Remote store seeding and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Push the built-in seed catalog to the remote store
//! cardvault seed
//!
//! # List remote products with stock levels
//! cardvault products
//!
//! # Overwrite one product's stock
//! cardvault set-stock --id 4 --stock 12
//!
//! # List visitor presence rows
//! cardvault visitors
//!
//! # Publish an announcement to every connected client
//! cardvault broadcast -m "Restock tonight at 8pm" -s success
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};

use cardvault_client::config::ClientConfig;
use cardvault_client::gateway::RestGateway;
use cardvault_core::Severity;

mod commands;

#[derive(Parser)]
#[command(name = "cardvault")]
#[command(author, version, about = "CardVault ops tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push the built-in seed catalog to the remote store
    Seed,
    /// List remote products with stock levels
    Products,
    /// Overwrite one product's stock count
    SetStock {
        /// Product id
        #[arg(long)]
        id: i64,

        /// New stock count
        #[arg(long)]
        stock: u32,
    },
    /// List visitor presence rows
    Visitors,
    /// Publish a broadcast to every connected client
    Broadcast {
        /// Announcement text
        #[arg(short, long)]
        message: String,

        /// Severity tag shown to clients
        #[arg(short, long, default_value = "info")]
        severity: SeverityArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SeverityArg {
    Info,
    Success,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Self::Info,
            SeverityArg::Success => Self::Success,
            SeverityArg::Warning => Self::Warning,
            SeverityArg::Error => Self::Error,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let gateway = RestGateway::new(&config.gateway)?;

    match cli.command {
        Commands::Seed => commands::seed::push(&gateway).await?,
        Commands::Products => commands::inventory::list(&gateway).await?,
        Commands::SetStock { id, stock } => {
            commands::inventory::set_stock(&gateway, id, stock).await?;
        }
        Commands::Visitors => commands::visitors::list(&gateway).await?,
        Commands::Broadcast { message, severity } => {
            commands::broadcast::publish(&gateway, &message, severity.into()).await?;
        }
    }
    Ok(())
}
