mod llm;
mod observability;
mod server;
mod session;
mod threads;
mod tools;

pub use llm::*;
pub use observability::*;
pub use server::*;
pub use session::*;
pub use threads::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub threads: ThreadsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.llm.base_url.is_empty() {
            errors.push(ConfigError::error("llm.base_url", "base_url must not be empty"));
        }
        if self.llm.model.is_empty() {
            errors.push(ConfigError::error("llm.model", "model must not be empty"));
        }
        if self.llm.auth.key.is_none() && self.llm.auth.env.is_none() {
            errors.push(ConfigError::warning(
                "llm.auth",
                "no API key source configured; sessions will fail until one is set",
            ));
        }
        if !(0.0..=2.0).contains(&self.session.temperature) {
            errors.push(ConfigError::error(
                "session.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }
        if self.session.max_tool_rounds == 0 {
            errors.push(ConfigError::warning(
                "session.max_tool_rounds",
                "0 disables tools entirely",
            ));
        }
        if self.session.outbound_buffer == 0 {
            errors.push(ConfigError::error(
                "session.outbound_buffer",
                "outbound buffer must hold at least one frame",
            ));
        }
        if self.threads.ttl_secs == 0 {
            errors.push(ConfigError::error(
                "threads.ttl_secs",
                "threads would expire immediately",
            ));
        }
        if self.threads.backend == ThreadBackend::File && self.threads.dir.as_os_str().is_empty() {
            errors.push(ConfigError::error(
                "threads.dir",
                "file backend requires a directory",
            ));
        }
        if self.tools.default_timezone.parse::<zone_name::Checked>().is_err() {
            errors.push(ConfigError::warning(
                "tools.default_timezone",
                format!("'{}' does not look like an IANA zone name", self.tools.default_timezone),
            ));
        }

        errors
    }
}

/// Minimal shape check for IANA zone names (`Area/Location` or `UTC`).
/// Full resolution happens in the tools crate, which owns the tz database.
mod zone_name {
    pub struct Checked;

    impl std::str::FromStr for Checked {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let valid = s == "UTC"
                || (s.contains('/')
                    && !s.starts_with('/')
                    && !s.ends_with('/')
                    && s.chars().all(|c| c.is_ascii_alphanumeric() || "/_-+".contains(c)));
            if valid {
                Ok(Checked)
            } else {
                Err(())
            }
        }
    }
}
