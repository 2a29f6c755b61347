//! JSON API endpoints.

pub mod evaluate;
pub mod panel;
pub mod records;
pub mod sync;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(sync::router())
        .merge(records::router())
        .merge(panel::router())
        .merge(evaluate::router())
}
