//! `get_current_time`: the wall-clock time in a named zone.

use anyhow::{anyhow, Result};
use chrono::Utc;
use chrono_tz::Tz;
use serde_json::{json, Value};
use tl_domain::tool::ToolDefinition;

use crate::context::ToolContext;
use crate::registry::Tool;

pub struct CurrentTimeTool {
    default_zone: Tz,
}

impl CurrentTimeTool {
    /// `default_zone` applies when neither the call nor the client names
    /// one. An unknown name falls back to UTC.
    pub fn new(default_zone: &str) -> Self {
        let default_zone = default_zone.parse().unwrap_or_else(|_| {
            tracing::warn!(zone = default_zone, "unknown default time zone, using UTC");
            Tz::UTC
        });
        Self { default_zone }
    }

    fn resolve_zone(&self, ctx: &ToolContext, args: &Value) -> Result<Tz> {
        if let Some(name) = args.get("timezone").and_then(|v| v.as_str()) {
            return name
                .parse()
                .map_err(|_| anyhow!("unknown time zone: {name}"));
        }
        Ok(ctx
            .query
            .time_zone()
            .and_then(|name| name.parse().ok())
            .unwrap_or(self.default_zone))
    }
}

#[async_trait::async_trait]
impl Tool for CurrentTimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_current_time".into(),
            description: "Get the current date and time. Defaults to the user's time zone.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "timezone": {
                        "type": "string",
                        "description": "IANA time zone name, e.g. Europe/London"
                    }
                }
            }),
        }
    }

    fn summarise(&self, args: &Value) -> String {
        match args.get("timezone").and_then(|v| v.as_str()) {
            Some(zone) => format!("Checking the time in {zone}"),
            None => "Checking the time".into(),
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let zone = self.resolve_zone(ctx, &args)?;
        let now = Utc::now().with_timezone(&zone);
        Ok(json!({
            "timezone": zone.name(),
            "time": now.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            "weekday": now.format("%A").to_string(),
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tl_domain::query::SessionQuery;
    use tokio_util::sync::CancellationToken;

    fn ctx(tz: Option<&str>) -> ToolContext {
        let mut query = SessionQuery::new("what time is it?");
        query.tz = tz.map(str::to_owned);
        ToolContext::new(CancellationToken::new(), Arc::new(query))
    }

    async fn zone_of(tool: &CurrentTimeTool, ctx: &ToolContext, args: Value) -> (String, String) {
        let out: Value = serde_json::from_str(&tool.call(ctx, args).await.unwrap()).unwrap();
        (
            out["timezone"].as_str().unwrap().to_owned(),
            out["time"].as_str().unwrap().to_owned(),
        )
    }

    #[tokio::test]
    async fn explicit_zone_wins() {
        let tool = CurrentTimeTool::new("UTC");
        let (zone, time) = zone_of(&tool, &ctx(Some("Europe/Paris")), json!({"timezone": "Etc/GMT-3"})).await;
        assert_eq!(zone, "Etc/GMT-3");
        assert!(time.ends_with("+03:00"), "{time}");
    }

    #[tokio::test]
    async fn client_zone_then_default() {
        let tool = CurrentTimeTool::new("Etc/GMT+5");
        let (zone, _) = zone_of(&tool, &ctx(Some("Asia/Tokyo")), json!({})).await;
        assert_eq!(zone, "Asia/Tokyo");

        let (zone, time) = zone_of(&tool, &ctx(None), json!({})).await;
        assert_eq!(zone, "Etc/GMT+5");
        assert!(time.ends_with("-05:00"), "{time}");
    }

    #[tokio::test]
    async fn unknown_zone_is_an_error() {
        let tool = CurrentTimeTool::new("UTC");
        let err = tool
            .call(&ctx(None), json!({"timezone": "Mars/Olympus"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown time zone: Mars/Olympus");
    }

    #[test]
    fn bad_default_falls_back_to_utc() {
        assert_eq!(CurrentTimeTool::new("Nowhere").default_zone, Tz::UTC);
    }
}
