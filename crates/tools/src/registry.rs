//! Closed tool registry: name → definition, kind and handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tl_domain::frame::FrameSink;
use tl_domain::tool::{ToolDefinition, ToolKind};

use crate::context::ToolContext;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn kind(&self) -> ToolKind {
        ToolKind::Function
    }

    /// One-line, client-facing description of an in-flight call.
    fn summarise(&self, args: &Value) -> String;

    /// Run the tool. The returned string should be a JSON object.
    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Returns self for chaining.
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
        self
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn is_action(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|t| t.kind() == ToolKind::Action)
    }

    /// Definitions to offer the model: every function, plus the actions
    /// the client said it supports.
    pub fn definitions_for(&self, supported_actions: &[String]) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|(name, tool)| match tool.kind() {
                ToolKind::Function => true,
                ToolKind::Action => supported_actions.iter().any(|a| a == *name),
            })
            .map(|(_, tool)| tool.definition())
            .collect()
    }

    /// Best-effort description of a call. Never fails.
    pub fn summarise(&self, name: &str, args: &str) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("Calling {name}…");
        };
        let args = serde_json::from_str(args).unwrap_or(Value::Null);
        tool.summarise(&args)
    }

    pub async fn call_function(&self, ctx: &ToolContext, name: &str, args: &str) -> Result<String> {
        let tool = self.lookup(name, ToolKind::Function)?;
        tool.call(ctx, parse_args(name, args)?).await
    }

    /// Run an action against the client's channel. Actions the client did
    /// not advertise in its `actions` list are refused.
    pub async fn call_action(
        &self,
        ctx: &ToolContext,
        name: &str,
        args: &str,
        outbound: Arc<dyn FrameSink>,
    ) -> Result<String> {
        let tool = self.lookup(name, ToolKind::Action)?;
        if !ctx.query.actions.iter().any(|a| a == name) {
            bail!("{name} is not supported by this client");
        }
        let ctx = ctx.with_outbound(outbound);
        tool.call(&ctx, parse_args(name, args)?).await
    }

    fn lookup(&self, name: &str, kind: ToolKind) -> Result<&Arc<dyn Tool>> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow!("unknown tool: {name}"))?;
        if tool.kind() != kind {
            let expected = match kind {
                ToolKind::Action => "an action",
                ToolKind::Function => "a function",
            };
            bail!("{name} is not {expected}");
        }
        Ok(tool)
    }
}

fn parse_args(name: &str, args: &str) -> Result<Value> {
    if args.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(args).with_context(|| format!("invalid arguments for {name}"))
}
