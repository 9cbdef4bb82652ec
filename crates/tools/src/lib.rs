//! Tools the model can call mid-answer.
//!
//! Every tool is registered up front in a [`ToolRegistry`] with its
//! definition, its [`ToolKind`](tl_domain::tool::ToolKind) and its handler.
//! Functions are pure and return a JSON string; actions additionally get
//! the session's outbound channel and may write frames to the client
//! while they run.

pub mod builtin;
pub mod context;
pub mod registry;

use std::sync::Arc;

use tl_domain::config::ToolsConfig;

pub use context::ToolContext;
pub use registry::{Tool, ToolRegistry};

/// Build the registry with every built-in tool.
pub fn build_default_registry(cfg: &ToolsConfig) -> anyhow::Result<ToolRegistry> {
    let registry = ToolRegistry::new()
        .register(Arc::new(builtin::time::CurrentTimeTool::new(
            &cfg.default_timezone,
        )))
        .register(Arc::new(builtin::web_fetch::WebFetchTool::new(
            &cfg.web_fetch,
        )?))
        .register(Arc::new(builtin::notice::ShowNoticeTool));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtins() {
        let registry = build_default_registry(&ToolsConfig::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec!["get_current_time", "show_notice", "web_fetch"]
        );
        assert!(registry.is_action("show_notice"));
        assert!(!registry.is_action("web_fetch"));
    }
}
