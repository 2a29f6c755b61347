//! CLI command implementations.

pub mod evaluate;
pub mod sync;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use discount_sync_admin::config::ConfigError;
use discount_sync_admin::shopify::AdminShopifyError;
use discount_sync_admin::sync::SyncError;
use discount_sync_core::ConditionError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The Shopify client could not be built.
    #[error("Shopify client error: {0}")]
    Client(#[from] AdminShopifyError),

    /// A sync operation failed.
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// A condition is misconfigured.
    #[error("{0}")]
    Condition(#[from] ConditionError),

    /// An input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file is not valid JSON for its purpose.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be encoded.
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write `value` to stdout as pretty JSON.
fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
