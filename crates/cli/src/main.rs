//! Frameshop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! fs-cli migrate
//!
//! # Load frames, mats, glass and reveal sizes
//! fs-cli seed catalog crates/cli/data/catalog.example.yaml
//!
//! # Recent orders, optionally by status
//! fs-cli orders list --status in_progress
//!
//! # Stage history of one order
//! fs-cli orders history 42
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "fs-cli")]
#[command(author, version, about = "Frameshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database from YAML files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Look up orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert the option catalog
    Catalog {
        /// Path to the catalog YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List recent orders, newest first
    List {
        /// Only orders in this status (e.g. `in_progress`)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of orders
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// Show the stage history of an order
    History {
        /// Order number
        id: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { status, limit } => {
                commands::orders::list(status.as_deref(), limit).await?;
            }
            OrdersAction::History { id } => commands::orders::history(id).await?,
        },
    }
    Ok(())
}
