//! Discount Sync CLI - one-shot sync passes and rule checks.
//!
//! # Usage
//!
//! ```bash
//! # Move a legacy per-field layout into the consolidated document
//! ds-cli migrate
//!
//! # Prune dead records and delete orphaned remote discounts
//! ds-cli reconcile
//!
//! # Print stored records as JSON
//! ds-cli records
//!
//! # Evaluate a condition list against a context, offline
//! ds-cli evaluate --conditions conditions.json --context cart.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run the legacy migration if needed
//! - `reconcile` - Run one reconciliation pass
//! - `records` - List stored records
//! - `evaluate` - Evaluate conditions without touching the store

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ds-cli")]
#[command(author, version, about = "Discount sync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the legacy per-field layout
    Migrate,
    /// Run one reconciliation pass
    Reconcile,
    /// List stored records
    Records,
    /// Evaluate conditions against an eligibility context
    Evaluate {
        /// JSON file holding an array of conditions
        #[arg(long)]
        conditions: PathBuf,

        /// JSON file holding the evaluation context
        #[arg(long)]
        context: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discount_sync_admin=info,discount_sync_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::sync::migrate().await?,
        Commands::Reconcile => commands::sync::reconcile().await?,
        Commands::Records => commands::sync::records().await?,
        Commands::Evaluate {
            conditions,
            context,
        } => commands::evaluate::run(&conditions, &context)?,
    }
    Ok(())
}
