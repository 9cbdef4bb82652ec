//! AppState construction and background-task spawning.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use tl_domain::config::{Config, ConfigSeverity, LlmStartupPolicy};
use tl_providers::{GoogleProvider, LlmProvider};

use crate::runtime::{SessionRuntime, SystemPrompt};
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    // ── LLM provider ─────────────────────────────────────────────────
    let provider: Option<Arc<dyn LlmProvider>> = match GoogleProvider::from_config(&config.llm) {
        Ok(p) => {
            tracing::info!(
                provider = %config.llm.provider_id,
                model = %config.llm.model,
                "LLM provider ready"
            );
            Some(Arc::new(p))
        }
        Err(e) => match config.llm.startup_policy {
            LlmStartupPolicy::RequireOne => {
                return Err(e).context("initializing LLM provider");
            }
            LlmStartupPolicy::AllowNone => {
                tracing::warn!(
                    error = %e,
                    "LLM provider unavailable; sessions will be refused until an API key is configured"
                );
                None
            }
        },
    };

    // ── Thread store ─────────────────────────────────────────────────
    let threads = tl_threads::open_store(&config.threads).context("opening thread store")?;

    // ── Tools ────────────────────────────────────────────────────────
    let tools = Arc::new(
        tl_tools::build_default_registry(&config.tools).context("building tool registry")?,
    );
    tracing::info!(tools = ?tools.names(), "tool registry ready");

    let prompt = SystemPrompt::new(
        config.session.system_prompt.clone(),
        &config.tools.default_timezone,
    );
    let runtime = SessionRuntime::new(provider, threads, tools, prompt)
        .with_limits(config.session.max_tool_rounds, config.session.temperature);

    Ok(AppState {
        config,
        runtime: Arc::new(runtime),
        shutdown,
    })
}

/// Spawn the periodic thread purge. Stops when the server shuts down.
pub fn spawn_background_tasks(state: &AppState) {
    let threads = state.runtime.threads().clone();
    let shutdown = state.shutdown.clone();
    let period = std::time::Duration::from_secs(state.config.threads.purge_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match threads.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "expired threads purged"),
                Err(e) => tracing::warn!(error = %e, "thread purge failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_domain::config::ThreadBackend;

    fn keyless() -> Config {
        let mut config = Config::default();
        config.llm.auth.key = None;
        config.llm.auth.env = Some("TL_TEST_BOOTSTRAP_KEY_NEVER_SET".into());
        config
    }

    #[tokio::test]
    async fn allow_none_boots_without_provider() {
        let state = build_app_state(Arc::new(keyless()), CancellationToken::new())
            .await
            .unwrap();
        assert!(state.runtime.provider().is_none());
        assert_eq!(state.runtime.threads().backend(), "memory");
    }

    #[tokio::test]
    async fn require_one_refuses_to_boot() {
        let mut config = keyless();
        config.llm.startup_policy = LlmStartupPolicy::RequireOne;
        assert!(build_app_state(Arc::new(config), CancellationToken::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn config_errors_refuse_to_boot() {
        let mut config = keyless();
        config.threads.backend = ThreadBackend::File;
        config.threads.dir = std::path::PathBuf::new();
        assert!(build_app_state(Arc::new(config), CancellationToken::new())
            .await
            .is_err());
    }
}
