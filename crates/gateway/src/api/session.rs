//! WebSocket session endpoint.
//!
//! Flow:
//! 1. Client connects to `/v1/session?prompt=...[&threadId=...][&tz=...][&actions=...]`
//! 2. Gateway streams `c`/`f` frames while the model answers
//! 3. On success: `d`, `t<thread id>`, then close 1000
//! 4. On a fatal error: close 1011 with a short reason

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use tl_domain::query::SessionQuery;

use crate::runtime::{SessionOutcome, SessionWriter};
use crate::state::AppState;

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// GET /v1/session: validate the query, then upgrade.
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    if query.prompt.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "prompt is required").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

async fn handle_socket(socket: WebSocket, state: AppState, query: SessionQuery) {
    let (ws_sink, mut ws_stream) = socket.split();
    let cancel = state.shutdown.child_token();

    let (writer, writer_task) =
        SessionWriter::spawn(ws_sink, state.config.session.outbound_buffer);
    let writer = Arc::new(writer);

    // Reader: the client never sends anything meaningful, but its close
    // (or a dead socket) must cancel the session.
    let reader = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            cancel.cancel();
        }
    });

    let outcome = state
        .runtime
        .run_session(query, writer.clone(), cancel)
        .await;

    let (code, reason) = match &outcome {
        SessionOutcome::Completed { .. } => (CLOSE_NORMAL, ""),
        SessionOutcome::Failed(e) => (CLOSE_INTERNAL_ERROR, e.close_reason().unwrap_or("")),
    };
    writer.close(code, reason).await;
    drop(writer);

    if let Err(e) = writer_task.await {
        tracing::warn!(error = %e, "session writer task failed");
    }
    reader.abort();
}
