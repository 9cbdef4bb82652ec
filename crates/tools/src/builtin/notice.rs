//! `show_notice`: an action that writes straight to the client.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tl_domain::frame::Frame;
use tl_domain::tool::{ToolDefinition, ToolKind};

use crate::context::ToolContext;
use crate::registry::Tool;

pub struct ShowNoticeTool;

#[async_trait::async_trait]
impl Tool for ShowNoticeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "show_notice".into(),
            description: "Show a short notice on the user's screen immediately, \
                          before the answer is finished."
                .into(),
            parameters: json!({
                "type": "object",
                "required": ["text"],
                "properties": {
                    "text": { "type": "string", "description": "Notice text" }
                }
            }),
        }
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Action
    }

    fn summarise(&self, _args: &Value) -> String {
        "Showing a notice".into()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("missing args.text"))?;
        let outbound = ctx
            .outbound()
            .ok_or_else(|| anyhow!("show_notice needs the client channel"))?;

        outbound.send(Frame::Content(format!("{text}\n"))).await?;
        Ok(json!({ "shown": true }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tl_domain::frame::FrameSink;
    use tl_domain::query::SessionQuery;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recorder(parking_lot::Mutex<Vec<Frame>>);

    #[async_trait::async_trait]
    impl FrameSink for Recorder {
        async fn send(&self, frame: Frame) -> tl_domain::error::Result<()> {
            self.0.lock().push(frame);
            Ok(())
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(CancellationToken::new(), Arc::new(SessionQuery::new("hi")))
    }

    #[tokio::test]
    async fn writes_a_content_frame() {
        let sink = Arc::new(Recorder::default());
        let out = ShowNoticeTool
            .call(&ctx().with_outbound(sink.clone()), json!({"text": "Timer set"}))
            .await
            .unwrap();
        assert_eq!(out, r#"{"shown":true}"#);
        assert_eq!(*sink.0.lock(), vec![Frame::Content("Timer set\n".into())]);
    }

    #[tokio::test]
    async fn fails_without_channel_or_text() {
        assert!(ShowNoticeTool.call(&ctx(), json!({"text": "x"})).await.is_err());
        let sink = Arc::new(Recorder::default());
        assert!(ShowNoticeTool
            .call(&ctx().with_outbound(sink), json!({}))
            .await
            .is_err());
    }
}
