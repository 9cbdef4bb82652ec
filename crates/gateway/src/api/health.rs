use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /health - liveness plus provider readiness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.runtime.provider();
    let status = if provider.is_some() { "ok" } else { "degraded" };
    Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "llm": {
            "ready": provider.is_some(),
            "provider": provider.map(|p| p.provider_id()),
            "model": provider.map(|p| p.default_model()),
        },
        "threads": {
            "backend": state.runtime.threads().backend(),
            "ttl_secs": state.config.threads.ttl_secs,
        },
    }))
}
