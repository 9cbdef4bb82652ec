//! Role+text codec for stored threads.
//!
//! The stored payload is a JSON array of `{"role", "content"}` objects.
//! Only user and model turns whose first part is non-blank text survive
//! encoding; tool calls and tool responses are dropped.

use serde::{Deserialize, Serialize};
use tl_domain::error::{Error, Result};
use tl_domain::tool::{Message, Role};

/// One persisted turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTurn {
    pub role: Role,
    pub content: String,
}

/// Reduce a conversation log to its persistable turns.
pub fn reduce(messages: &[Message]) -> Vec<StoredTurn> {
    messages
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Model))
        .filter_map(|m| {
            let text = m.first_text()?;
            if text.trim().is_empty() {
                return None;
            }
            Some(StoredTurn {
                role: m.role,
                content: text.to_owned(),
            })
        })
        .collect()
}

pub fn encode_thread(messages: &[Message]) -> Result<String> {
    Ok(serde_json::to_string(&reduce(messages))?)
}

/// Parse a stored payload back into single-text-part messages.
pub fn decode_thread(thread_id: &str, payload: &str) -> Result<Vec<Message>> {
    let turns: Vec<StoredTurn> =
        serde_json::from_str(payload).map_err(|e| Error::ThreadDecode {
            thread_id: thread_id.to_owned(),
            message: e.to_string(),
        })?;
    Ok(turns
        .into_iter()
        .map(|t| Message::text(t.role, t.content))
        .collect())
}
