pub mod health;
pub mod session;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/session", get(session::session_ws))
}
