use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted during LLM streaming (provider-agnostic).
///
/// A stream carries any number of `Token`s, at most one meaningful
/// `FunctionCall` per turn, and ends with `Done`. Reaching the end of the
/// stream without `Done` is equivalent to `Done { usage: None, .. }`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// A text token chunk.
    #[serde(rename = "token")]
    Token { text: String },

    /// The model asked for a function to be invoked.
    #[serde(rename = "function_call")]
    FunctionCall {
        name: String,
        arguments: serde_json::Value,
    },

    /// Stream is finished.
    #[serde(rename = "done")]
    Done {
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },

    /// The provider reported an error inside an otherwise healthy stream.
    #[serde(rename = "error")]
    Error { message: String },
}

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Fold another usage report into this running total.
    pub fn accumulate(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_sums_every_counter() {
        let mut total = Usage::default();
        total.accumulate(&Usage {
            prompt_tokens: 10,
            completion_tokens: 3,
            total_tokens: 13,
        });
        total.accumulate(&Usage {
            prompt_tokens: 20,
            completion_tokens: 5,
            total_tokens: 25,
        });
        assert_eq!(total.prompt_tokens, 30);
        assert_eq!(total.completion_tokens, 8);
        assert_eq!(total.total_tokens, 38);
    }

    #[test]
    fn token_event_serializes_with_type_tag() {
        let ev = StreamEvent::Token { text: "hi".into() };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "token");
        assert_eq!(json["text"], "hi");
    }
}
