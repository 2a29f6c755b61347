//! Sync pipeline handlers.

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use crate::{error::AppError, state::AppState, sync::SyncReport};

/// Build the sync router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sync", post(run_sync))
        .route("/api/migrate", post(run_migration))
}

/// Response for a migration run.
#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub migrated: bool,
}

/// Run one reconciliation pass.
///
/// POST /api/sync
///
/// # Errors
///
/// Returns 409 if a pass is already running, or a gateway error if the
/// remote store fails.
pub async fn run_sync(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    let report = state.engine().reconcile().await?;
    Ok(Json(report))
}

/// Migrate the legacy per-field layout, if any.
///
/// POST /api/migrate
///
/// # Errors
///
/// Returns an error if reading, writing or deleting documents fails.
pub async fn run_migration(
    State(state): State<AppState>,
) -> Result<Json<MigrateResponse>, AppError> {
    let migrated = state.engine().migrate_if_needed().await?;
    Ok(Json(MigrateResponse { migrated }))
}
