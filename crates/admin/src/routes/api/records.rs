//! Record lifecycle handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use discount_sync_core::{DiscountRecord, RecordId};

use crate::{error::AppError, state::AppState, sync::PersistOutcome};

/// Build the records router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/records", get(list_records).post(publish_record))
        .route("/api/records/{id}/active", post(set_active))
        .route("/api/records/{id}", delete(remove_record))
}

/// Request for toggling a record.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// List stored records in document order.
///
/// GET /api/records
///
/// # Errors
///
/// Returns an error if the records document cannot be read or decoded.
pub async fn list_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<DiscountRecord>>, AppError> {
    let records = state.engine().records().list().await?;
    Ok(Json(records))
}

/// Validate, create the remote object and save a record.
///
/// POST /api/records
///
/// # Errors
///
/// Returns 422 for an invalid or duplicate record, or a gateway error if
/// creating the remote object fails.
pub async fn publish_record(
    State(state): State<AppState>,
    Json(record): Json<DiscountRecord>,
) -> Result<(StatusCode, Json<DiscountRecord>), AppError> {
    let record = state.engine().records().publish(record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Activate or deactivate a record.
///
/// POST /api/records/{id}/active
///
/// # Errors
///
/// Returns 404 for an unknown record.
pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetActiveRequest>,
) -> Result<Json<DiscountRecord>, AppError> {
    let record = state
        .engine()
        .records()
        .set_active(&RecordId::new(id), body.active)
        .await?;
    Ok(Json(record))
}

/// Remove a record and its remote object.
///
/// DELETE /api/records/{id}
///
/// # Errors
///
/// Returns 404 for an unknown record, or a gateway error if the remote
/// object cannot be deleted.
pub async fn remove_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PersistOutcome>, AppError> {
    let outcome = state.engine().records().remove(&RecordId::new(id)).await?;
    Ok(Json(outcome))
}
