use tl_domain::error::Result;
use tl_domain::stream::{BoxStream, StreamEvent};
use tl_domain::tool::{Message, ToolDefinition};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic streaming chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,
    /// System instruction sent alongside the conversation.
    pub system_prompt: Option<String>,
    /// Tool definitions the model may invoke. Empty = no tools offered.
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Number of candidates to generate. Only the first is ever read.
    pub candidate_count: u32,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            tools: Vec::new(),
            temperature: None,
            candidate_count: 1,
            model: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every LLM adapter must implement.
///
/// The returned stream yields text tokens and function calls as the
/// backend produces them and finishes with [`StreamEvent::Done`]. An `Err`
/// item means the stream broke and the caller must stop reading it.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat request and return a stream of events.
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// The model used when a request does not name one.
    fn default_model(&self) -> &str;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
