use serde::Serialize;

/// Structured trace events emitted across all threadline crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ThreadRestored {
        thread_id: String,
        messages: usize,
    },
    ThreadStored {
        thread_id: String,
        messages: usize,
        ttl_secs: u64,
    },
    LlmRequest {
        provider: String,
        model: String,
        iteration: u32,
        tools_offered: usize,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolDispatched {
        tool_name: String,
        action: bool,
        is_error: bool,
        duration_ms: u64,
    },
    SessionCompleted {
        thread_id: String,
        iterations: u32,
        input_tokens: u32,
        output_tokens: u32,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tl_event");
    }
}
