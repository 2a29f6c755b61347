//! Panel settings handlers.

use axum::{Json, Router, extract::State, routing::get};

use discount_sync_core::PanelSettings;

use crate::{error::AppError, state::AppState, sync::PersistOutcome};

/// Build the panel router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/panel", get(get_panel).put(save_panel))
}

/// Read the stored panel settings.
///
/// GET /api/panel
///
/// # Errors
///
/// Returns an error if the panel namespace cannot be listed.
pub async fn get_panel(State(state): State<AppState>) -> Result<Json<PanelSettings>, AppError> {
    let settings = state.engine().writer().load_panel().await?;
    Ok(Json(settings))
}

/// Save panel settings. Blank values delete their field.
///
/// PUT /api/panel
///
/// # Errors
///
/// Returns 409 while another save runs, or a gateway error if a chunk fails.
pub async fn save_panel(
    State(state): State<AppState>,
    Json(settings): Json<PanelSettings>,
) -> Result<Json<PersistOutcome>, AppError> {
    let outcome = state.engine().writer().persist_panel(&settings).await?;
    Ok(Json(outcome))
}
