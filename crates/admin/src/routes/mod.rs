//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//!
//! # Sync
//! POST   /api/sync                  - Run a reconciliation pass (409 while one runs)
//! POST   /api/migrate               - Migrate the legacy layout if present
//!
//! # Records
//! GET    /api/records               - List stored records
//! POST   /api/records               - Publish a record
//! POST   /api/records/{id}/active   - Activate or deactivate a record
//! DELETE /api/records/{id}          - Remove a record and its remote object
//!
//! # Panel
//! GET    /api/panel                 - Read panel settings
//! PUT    /api/panel                 - Save panel settings
//!
//! # Rules
//! POST   /api/evaluate              - Evaluate conditions against a context
//! ```

pub mod api;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(api::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the remote store.
async fn health() -> &'static str {
    "ok"
}
