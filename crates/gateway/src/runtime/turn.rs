//! Turn loop: drives one client session from prompt to stored thread.
//!
//! Each iteration streams one model reply, relays text deltas as they
//! arrive, and either dispatches the single tool call the reply asked for
//! (then loops) or finalizes: `d` frame, thread persisted, `t` frame.
//! Tools are only offered for the first `max_tool_rounds` iterations, so
//! the loop always ends.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use futures_util::StreamExt;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use tl_domain::error::Error;
use tl_domain::frame::{Frame, FrameSink};
use tl_domain::query::SessionQuery;
use tl_domain::stream::{StreamEvent, Usage};
use tl_domain::tool::{FunctionCall, Message};
use tl_domain::trace::TraceEvent;
use tl_providers::{ChatRequest, LlmProvider};
use tl_threads::ThreadStore;
use tl_tools::{ToolContext, ToolRegistry};

use super::prompt::SystemPrompt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fatal session failures. Each ends the session without a stored thread
/// (except `Transport` after persistence, when the id could not be sent).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("model client unavailable: {0}")]
    ClientUnavailable(String),

    #[error("restoring thread {thread_id}: {source}")]
    Restore {
        thread_id: String,
        #[source]
        source: Error,
    },

    #[error("model stream failed: {0}")]
    Stream(#[source] Error),

    #[error("storing thread failed: {0}")]
    Persist(#[source] Error),

    #[error("writing to client failed: {0}")]
    Transport(#[source] Error),

    #[error("session cancelled")]
    Cancelled,
}

impl SessionError {
    /// Reason sent with the internal-error close frame. `None` when the
    /// connection is already gone.
    pub fn close_reason(&self) -> Option<&'static str> {
        match self {
            SessionError::ClientUnavailable(_) => Some("Error creating client."),
            SessionError::Restore { .. } => Some("Error restoring thread."),
            SessionError::Stream(_) => Some("model request failed"),
            SessionError::Persist(_) => Some("store thread failed"),
            SessionError::Transport(_) | SessionError::Cancelled => None,
        }
    }
}

#[derive(Debug)]
pub enum SessionOutcome {
    Completed {
        thread_id: Uuid,
        usage: Usage,
        iterations: u32,
    },
    Failed(SessionError),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runtime
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a session needs, shared by all connections.
pub struct SessionRuntime {
    /// `None` when the model client could not be built at startup.
    provider: Option<Arc<dyn LlmProvider>>,
    threads: Arc<dyn ThreadStore>,
    tools: Arc<ToolRegistry>,
    prompt: SystemPrompt,
    max_tool_rounds: u32,
    temperature: f32,
}

/// What one streamed reply produced.
#[derive(Default)]
struct TurnReply {
    text: String,
    call: Option<FunctionCall>,
    calls_seen: usize,
    usage: Option<Usage>,
}

impl SessionRuntime {
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        threads: Arc<dyn ThreadStore>,
        tools: Arc<ToolRegistry>,
        prompt: SystemPrompt,
    ) -> Self {
        Self {
            provider,
            threads,
            tools,
            prompt,
            max_tool_rounds: 10,
            temperature: 0.5,
        }
    }

    pub fn with_limits(mut self, max_tool_rounds: u32, temperature: f32) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.provider.as_ref()
    }

    pub fn threads(&self) -> &Arc<dyn ThreadStore> {
        &self.threads
    }

    /// Run one session to completion. Never panics on client or model
    /// misbehaviour; every failure is reported through the outcome.
    pub async fn run_session(
        &self,
        query: SessionQuery,
        outbound: Arc<dyn FrameSink>,
        cancel: CancellationToken,
    ) -> SessionOutcome {
        let thread_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "session",
            %thread_id,
            prior_thread = query.prior_thread().unwrap_or(""),
        );

        let outbound = Arc::new(GuardedSink::new(outbound));
        match self
            .drive(thread_id, query, outbound, cancel)
            .instrument(span.clone())
            .await
        {
            Ok((usage, iterations)) => {
                TraceEvent::SessionCompleted {
                    thread_id: thread_id.to_string(),
                    iterations,
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                }
                .emit();
                SessionOutcome::Completed {
                    thread_id,
                    usage,
                    iterations,
                }
            }
            Err(e) => {
                span.in_scope(|| match &e {
                    SessionError::Cancelled => tracing::info!("session cancelled by client"),
                    other => tracing::error!(error = %other, "session failed"),
                });
                SessionOutcome::Failed(e)
            }
        }
    }

    async fn drive(
        &self,
        thread_id: Uuid,
        query: SessionQuery,
        outbound: Arc<GuardedSink>,
        cancel: CancellationToken,
    ) -> Result<(Usage, u32), SessionError> {
        let provider = self.provider.clone().ok_or_else(|| {
            SessionError::ClientUnavailable("no model provider configured".into())
        })?;

        let query = Arc::new(query);
        let mut messages = vec![Message::user(query.prompt.clone())];

        // ── Restore ───────────────────────────────────────────────────
        if let Some(prior) = query.prior_thread() {
            let mut restored = race(&cancel, self.threads.restore(prior))
                .await?
                .map_err(|source| SessionError::Restore {
                    thread_id: prior.to_owned(),
                    source,
                })?;
            tracing::debug!(restored = restored.len(), "prior thread restored");
            restored.append(&mut messages);
            messages = restored;
        }

        let tool_ctx = ToolContext::new(cancel.clone(), query.clone());
        let mut usage = Usage::default();
        let mut iteration: u32 = 0;

        loop {
            iteration += 1;

            let tools = if iteration <= self.max_tool_rounds {
                self.tools.definitions_for(&query.actions)
            } else {
                Vec::new()
            };
            let tools_offered = tools.len();

            let req = ChatRequest {
                messages: messages.clone(),
                system_prompt: Some(self.prompt.build(&query, chrono::Utc::now())),
                tools,
                temperature: Some(self.temperature),
                candidate_count: 1,
                model: None,
            };

            // ── Stream one reply ──────────────────────────────────────
            let llm_span = tracing::info_span!(
                "llm.call",
                "otel.kind" = "CLIENT",
                iteration,
                tools_offered,
                input_tokens = tracing::field::Empty,
                output_tokens = tracing::field::Empty,
            );
            let started = Instant::now();
            let reply = self
                .stream_reply(provider.as_ref(), &req, outbound.as_ref(), &cancel)
                .instrument(llm_span.clone())
                .await?;

            if let Some(u) = &reply.usage {
                llm_span.record("input_tokens", u.prompt_tokens);
                llm_span.record("output_tokens", u.completion_tokens);
                usage.accumulate(u);
            }
            TraceEvent::LlmRequest {
                provider: provider.provider_id().to_owned(),
                model: provider.default_model().to_owned(),
                iteration,
                tools_offered,
                duration_ms: started.elapsed().as_millis() as u64,
                prompt_tokens: reply.usage.map(|u| u.prompt_tokens),
                completion_tokens: reply.usage.map(|u| u.completion_tokens),
            }
            .emit();

            if !reply.text.trim().is_empty() {
                messages.push(Message::model(reply.text));
            }

            if reply.calls_seen > 1 {
                tracing::warn!(
                    calls = reply.calls_seen,
                    discarded = reply.calls_seen - 1,
                    "model returned several function calls in one turn; keeping the last"
                );
            }

            let call = match reply.call {
                Some(call) if tools_offered == 0 => {
                    tracing::warn!(
                        tool_name = %call.name,
                        iteration,
                        "function call on a turn without tools; ignoring it"
                    );
                    None
                }
                other => other,
            };

            // ── Finalize ──────────────────────────────────────────────
            let Some(call) = call else {
                send(outbound.as_ref(), Frame::Done).await?;
                break;
            };

            // ── Dispatch ──────────────────────────────────────────────
            messages.push(Message::function_call(call.clone()));
            let response = self
                .dispatch(&tool_ctx, &call, &outbound, &cancel)
                .await?;
            messages.push(Message::function_response(call.name, response));
            tracing::debug!(iteration, "going around again");
        }

        // A frame the client never received must not leave a thread behind.
        outbound.check()?;
        race(&cancel, self.threads.store(&thread_id, &messages))
            .await?
            .map_err(SessionError::Persist)?;

        send(outbound.as_ref(), Frame::Thread(thread_id)).await?;
        tracing::info!(iterations = iteration, "session handled");
        Ok((usage, iteration))
    }

    async fn stream_reply(
        &self,
        provider: &dyn LlmProvider,
        req: &ChatRequest,
        outbound: &dyn FrameSink,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, SessionError> {
        let mut stream = race(cancel, provider.chat_stream(req))
            .await?
            .map_err(SessionError::Stream)?;

        let mut reply = TurnReply::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SessionError::Cancelled),
                next = stream.next() => next,
            };
            let Some(event) = next else { break };

            match event.map_err(SessionError::Stream)? {
                StreamEvent::Token { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    send(outbound, Frame::Content(text.clone())).await?;
                    reply.text.push_str(&text);
                }
                StreamEvent::FunctionCall { name, arguments } => {
                    reply.calls_seen += 1;
                    reply.call = Some(FunctionCall {
                        name,
                        args: arguments,
                    });
                }
                StreamEvent::Done { usage, .. } => {
                    if usage.is_some() {
                        reply.usage = usage;
                    }
                }
                StreamEvent::Error { message } => {
                    return Err(SessionError::Stream(Error::Provider {
                        provider: provider.provider_id().to_owned(),
                        message,
                    }));
                }
            }
        }
        Ok(reply)
    }

    /// Announce and run one tool call. A tool failure becomes
    /// `{"error": "failed to call function: …"}` for the model to read;
    /// only transport and cancellation are fatal.
    async fn dispatch(
        &self,
        ctx: &ToolContext,
        call: &FunctionCall,
        outbound: &Arc<GuardedSink>,
        cancel: &CancellationToken,
    ) -> Result<Map<String, Value>, SessionError> {
        let args = serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".into());
        let action = self.tools.is_action(&call.name);

        send(
            outbound.as_ref(),
            Frame::ToolCall(self.tools.summarise(&call.name, &args)),
        )
        .await?;

        let span = tracing::info_span!("tool.call", tool_name = %call.name, action);
        let started = Instant::now();
        let result = async {
            tracing::info!("calling function");
            if action {
                let sink: Arc<dyn FrameSink> = outbound.clone();
                self.tools.call_action(ctx, &call.name, &args, sink).await
            } else {
                self.tools.call_function(ctx, &call.name, &args).await
            }
        };
        let result = race(cancel, result.instrument(span.clone())).await?;
        // An action whose own write failed reports it as a tool error; the
        // broken channel still ends the session.
        outbound.check()?;

        let (text, is_error) = match result {
            Ok(text) => (text, false),
            Err(e) => {
                span.in_scope(|| tracing::warn!(error = %e, "function call failed"));
                (format!("failed to call function: {e}"), true)
            }
        };
        TraceEvent::ToolDispatched {
            tool_name: call.name.clone(),
            action,
            is_error,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        if is_error {
            let mut map = Map::new();
            map.insert("error".into(), Value::String(text));
            return Ok(map);
        }
        Ok(parse_result(&text))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run `fut` unless the session is cancelled first.
async fn race<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, SessionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        out = fut => Ok(out),
    }
}

/// The session's client channel. Remembers the first failed write, so a
/// write failure is fatal even when an action handler swallowed it.
struct GuardedSink {
    inner: Arc<dyn FrameSink>,
    failure: OnceLock<String>,
}

impl GuardedSink {
    fn new(inner: Arc<dyn FrameSink>) -> Self {
        Self {
            inner,
            failure: OnceLock::new(),
        }
    }

    fn check(&self) -> Result<(), SessionError> {
        match self.failure.get() {
            Some(message) => Err(SessionError::Transport(Error::Transport(message.clone()))),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl FrameSink for GuardedSink {
    async fn send(&self, frame: Frame) -> tl_domain::error::Result<()> {
        self.inner.send(frame).await.map_err(|e| {
            let _ = self.failure.set(e.to_string());
            e
        })
    }
}

async fn send(outbound: &dyn FrameSink, frame: Frame) -> Result<(), SessionError> {
    outbound.send(frame).await.map_err(SessionError::Transport)
}

/// Tool output as a JSON object. Anything else degrades to an empty
/// object.
fn parse_result(text: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
