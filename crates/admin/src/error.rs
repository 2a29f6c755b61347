//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use discount_sync_core::ConditionError;

use crate::store::StoreError;
use crate::sync::SyncError;

/// Application-level error type for request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// A sync pipeline operation failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// A direct remote store call failed.
    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),

    /// A submitted condition cannot be evaluated.
    #[error("Invalid condition: {0}")]
    Condition(#[from] ConditionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

const fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        StoreError::Transient(_)
        | StoreError::Unauthorized(_)
        | StoreError::Rejected(_)
        | StoreError::Serialization(_) => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    /// HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Sync(err) => match err {
                SyncError::Busy(_) => StatusCode::CONFLICT,
                SyncError::Record(_) | SyncError::DuplicateName(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SyncError::RecordNotFound(_) => StatusCode::NOT_FOUND,
                SyncError::Store(e) | SyncError::PartialBatch { source: e, .. } => store_status(e),
                SyncError::Corrupt { .. } | SyncError::Encode(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Store(e) => store_status(e),
            Self::Condition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Sync request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else if status.is_server_error() {
            "External service error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discount_sync_core::ConditionId;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("record-123".to_string());
        assert_eq!(err.to_string(), "Not found: record-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_busy_is_conflict() {
        assert_eq!(
            get_status(AppError::Sync(SyncError::Busy("reconciliation"))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_condition_error_is_unprocessable() {
        let err = ConditionError::EmptyValue {
            condition_id: ConditionId::new("c1"),
            condition_type: "country".to_string(),
        };
        assert_eq!(
            get_status(AppError::Condition(err)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_store_errors_map_to_gateway_statuses() {
        assert_eq!(
            get_status(AppError::Store(StoreError::Transient("reset".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::Timeout(
                std::time::Duration::from_secs(15)
            ))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            get_status(AppError::Sync(SyncError::PartialBatch {
                chunk: 2,
                total: 3,
                applied: 1,
                source: StoreError::RateLimited(2),
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
