//! Google Gemini adapter.
//!
//! Implements the Gemini `streamGenerateContent` API over SSE.
//! Auth is via an API key passed as a query parameter (`key={api_key}`).

use crate::traits::{ChatRequest, LlmProvider};
use crate::util::{from_reqwest, redact_url_key, resolve_api_key};
use serde_json::Value;
use tl_domain::config::LlmConfig;
use tl_domain::error::{Error, Result};
use tl_domain::stream::{BoxStream, StreamEvent, Usage};
use tl_domain::tool::{Message, Part, Role, ToolDefinition};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for the Google Gemini API.
pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a new provider from the `[llm]` config section.
    ///
    /// Fails when no API key can be resolved or the HTTP client cannot be
    /// built.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.provider_id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.model.clone(),
            client,
        })
    }

    fn stream_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, self.api_key
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request serialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the `streamGenerateContent` request body.
pub(crate) fn build_body(req: &ChatRequest) -> Value {
    let contents: Vec<Value> = req.messages.iter().map(message_to_gemini).collect();

    let mut body = serde_json::json!({
        "contents": contents,
    });

    if let Some(system) = req.system_prompt.as_deref().filter(|s| !s.is_empty()) {
        body["systemInstruction"] = serde_json::json!({
            "parts": [{"text": system}]
        });
    }

    if !req.tools.is_empty() {
        let function_declarations: Vec<Value> = req.tools.iter().map(tool_to_gemini).collect();
        body["tools"] = serde_json::json!([{
            "functionDeclarations": function_declarations,
        }]);
    }

    let mut gen_config = serde_json::json!({
        "candidateCount": req.candidate_count.max(1),
    });
    if let Some(temp) = req.temperature {
        gen_config["temperature"] = serde_json::json!(temp);
    }
    body["generationConfig"] = gen_config;

    body
}

fn message_to_gemini(msg: &Message) -> Value {
    // Function responses travel as user-role content on the public API.
    let role = match msg.role {
        Role::User | Role::Function => "user",
        Role::Model => "model",
    };
    let parts: Vec<Value> = msg.parts.iter().map(part_to_gemini).collect();
    serde_json::json!({
        "role": role,
        "parts": parts,
    })
}

fn part_to_gemini(part: &Part) -> Value {
    match part {
        Part::Text(text) => serde_json::json!({"text": text}),
        Part::FunctionCall(call) => serde_json::json!({
            "functionCall": {
                "name": call.name,
                "args": call.args,
            }
        }),
        Part::FunctionResponse(resp) => serde_json::json!({
            "functionResponse": {
                "name": resp.name,
                "response": resp.response,
            }
        }),
    }
}

fn tool_to_gemini(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v
        .get("candidatesTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let total = v
        .get("totalTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}

/// Stateful parser for one streamed reply.
///
/// Gemini repeats `usageMetadata` on many chunks with running totals; the
/// most recent report wins and is attached to the final `Done`.
#[derive(Default)]
pub(crate) struct GeminiStreamParser {
    last_usage: Option<Usage>,
}

impl GeminiStreamParser {
    pub(crate) fn parse(&mut self, data: &str) -> Vec<Result<StreamEvent>> {
        let mut events = Vec::new();

        let v: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                events.push(Err(Error::Json(e)));
                return events;
            }
        };

        if let Some(err) = v.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            events.push(Ok(StreamEvent::Error { message }));
            return events;
        }

        if let Some(usage) = v.get("usageMetadata").and_then(parse_gemini_usage) {
            self.last_usage = Some(usage);
        }

        let Some(candidate) = v
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|a| a.first())
        else {
            return events;
        };

        if let Some(parts) = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
        {
            for part in parts {
                if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                    if !text.is_empty() {
                        events.push(Ok(StreamEvent::Token {
                            text: text.to_string(),
                        }));
                    }
                }
                if let Some(fc) = part.get("functionCall") {
                    let name = fc
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    let arguments = fc
                        .get("args")
                        .cloned()
                        .unwrap_or(Value::Object(Default::default()));
                    events.push(Ok(StreamEvent::FunctionCall { name, arguments }));
                }
            }
        }

        if let Some(fr) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            let finish_reason = match fr {
                "STOP" => "stop".to_string(),
                "MAX_TOKENS" => "length".to_string(),
                other => other.to_lowercase(),
            };
            events.push(Ok(StreamEvent::Done {
                usage: self.last_usage,
                finish_reason: Some(finish_reason),
            }));
        }

        events
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let model = req.model.as_deref().unwrap_or(&self.default_model);
        let url = self.stream_url(model);
        let body = build_body(req);

        tracing::debug!(
            provider = %self.id,
            url = %redact_url_key(&url),
            messages = req.messages.len(),
            tools = req.tools.len(),
            "google stream request"
        );

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        let mut parser = GeminiStreamParser::default();
        Ok(crate::sse::sse_response_stream(resp, move |data| {
            parser.parse(data)
        }))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use tl_domain::tool::FunctionCall;

    #[test]
    fn body_carries_history_tools_and_generation_config() {
        let mut response = serde_json::Map::new();
        response.insert("time".into(), serde_json::json!("12:00"));
        let req = ChatRequest {
            messages: vec![
                Message::user("what time is it?"),
                Message::function_call(FunctionCall {
                    name: "get_current_time".into(),
                    args: serde_json::json!({}),
                }),
                Message::function_response("get_current_time", response),
            ],
            system_prompt: Some("be brief".into()),
            tools: vec![ToolDefinition {
                name: "get_current_time".into(),
                description: "Current time".into(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            }],
            temperature: Some(0.5),
            candidate_count: 1,
            model: None,
        };

        let body = build_body(&req);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "get_current_time"
        );
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["time"],
            "12:00"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "get_current_time"
        );
        assert_eq!(body["generationConfig"]["candidateCount"], 1);
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn body_omits_tools_when_none_offered() {
        let req = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let body = build_body(&req);
        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn parser_emits_tokens_and_function_calls() {
        let mut parser = GeminiStreamParser::default();
        let events = parser.parse(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"Let me check. "},
                {"functionCall":{"name":"get_current_time","args":{"timezone":"UTC"}}}
            ]}}]}"#,
        );
        assert_eq!(events.len(), 2);
        match &events[0] {
            Ok(StreamEvent::Token { text }) => assert_eq!(text, "Let me check. "),
            other => panic!("expected token, got {other:?}"),
        }
        match &events[1] {
            Ok(StreamEvent::FunctionCall { name, arguments }) => {
                assert_eq!(name, "get_current_time");
                assert_eq!(arguments["timezone"], "UTC");
            }
            other => panic!("expected function call, got {other:?}"),
        }
    }

    #[test]
    fn parser_attaches_latest_usage_to_done() {
        let mut parser = GeminiStreamParser::default();
        parser.parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"4"}]}}],
                "usageMetadata":{"promptTokenCount":7,"candidatesTokenCount":1}}"#,
        );
        let events = parser.parse(
            r#"{"candidates":[{"content":{"parts":[]},"finishReason":"STOP"}]}"#,
        );
        match events.last() {
            Some(Ok(StreamEvent::Done { usage, finish_reason })) => {
                let usage = (*usage).expect("usage carried over");
                assert_eq!(usage.prompt_tokens, 7);
                assert_eq!(usage.completion_tokens, 1);
                assert_eq!(usage.total_tokens, 8);
                assert_eq!(finish_reason.as_deref(), Some("stop"));
            }
            other => panic!("expected done, got {other:?}"),
        }
    }

    #[test]
    fn parser_surfaces_inline_errors() {
        let mut parser = GeminiStreamParser::default();
        let events = parser.parse(r#"{"error":{"code":429,"message":"quota exceeded"}}"#);
        assert!(matches!(
            events.as_slice(),
            [Ok(StreamEvent::Error { message })] if message == "quota exceeded"
        ));
    }

    #[test]
    fn parser_rejects_malformed_json() {
        let mut parser = GeminiStreamParser::default();
        let events = parser.parse("{not json");
        assert!(matches!(events.as_slice(), [Err(Error::Json(_))]));
    }

    #[test]
    fn from_config_requires_a_key() {
        let mut cfg = LlmConfig::default();
        cfg.auth.key = None;
        cfg.auth.env = Some("TL_TEST_GOOGLE_KEY_NEVER_SET".into());
        assert!(matches!(
            GoogleProvider::from_config(&cfg),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn stream_url_accepts_prefixed_model_names() {
        let mut cfg = LlmConfig::default();
        cfg.auth.key = Some("k".into());
        let p = GoogleProvider::from_config(&cfg).unwrap();
        assert_eq!(
            p.stream_url("models/gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse&key=k"
        );
    }
}
