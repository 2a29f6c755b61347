//! Commands that talk to the remote store.
//!
//! # Environment Variables
//!
//! - `SHOPIFY_STORE` - Store domain or handle
//! - `SHOPIFY_ADMIN_ACCESS_TOKEN` - Admin API token
//! - `DISCOUNT_APP_HANDLE` - Handle of the app that owns the discounts
//! - `SYNC_*` - Pipeline tuning, see the admin crate's config module

use std::sync::Arc;

use serde::Serialize;

use discount_sync_admin::config::{AppIdentityConfig, ShopifyAdminConfig, SyncConfig};
use discount_sync_admin::shopify::AdminClient;
use discount_sync_admin::sync::SyncEngine;

use super::{CliError, print_json};

#[derive(Debug, Serialize)]
struct MigrateOutput {
    migrated: bool,
}

fn engine() -> Result<SyncEngine<AdminClient>, CliError> {
    dotenvy::dotenv().ok();

    let shopify = ShopifyAdminConfig::from_env()?;
    let app = AppIdentityConfig::from_env()?;
    let sync = SyncConfig::from_env()?;

    let client = AdminClient::new(&shopify, sync.request_timeout)?;
    tracing::info!(store = %client.store(), app = %app.handle, "Connected to Shopify Admin API");
    Ok(SyncEngine::new(Arc::new(client), sync, &app))
}

/// Run the legacy migration if the consolidated document is missing.
pub async fn migrate() -> Result<(), CliError> {
    let migrated = engine()?.migrate_if_needed().await?;
    if migrated {
        tracing::info!("Legacy layout migrated");
    } else {
        tracing::info!("Nothing to migrate");
    }
    print_json(&MigrateOutput { migrated })
}

/// Run one reconciliation pass and print its report.
pub async fn reconcile() -> Result<(), CliError> {
    let report = engine()?.reconcile().await?;
    print_json(&report)
}

/// Print stored records.
pub async fn records() -> Result<(), CliError> {
    let records = engine()?.records().list().await?;
    tracing::info!(count = records.len(), "Loaded records");
    print_json(&records)
}
