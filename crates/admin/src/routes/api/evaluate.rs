//! Rule evaluation handler.

use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};

use discount_sync_core::{Condition, EvaluationContext, rules};

use crate::error::AppError;
use crate::state::AppState;

/// Build the evaluation router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/evaluate", post(evaluate))
}

/// Request for evaluating a condition list.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub context: EvaluationContext,
}

/// Evaluation result.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub eligible: bool,
}

/// Evaluate conditions against a context.
///
/// POST /api/evaluate
///
/// # Errors
///
/// Returns 422 if a condition is misconfigured.
pub async fn evaluate(Json(body): Json<EvaluateRequest>) -> Result<Json<EvaluateResponse>, AppError> {
    let eligible = rules::evaluate(&body.conditions, &body.context)?;
    tracing::debug!(conditions = body.conditions.len(), eligible, "Evaluated conditions");
    Ok(Json(EvaluateResponse { eligible }))
}
