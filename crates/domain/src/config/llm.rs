use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generative backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Identifier used in logs and trace events.
    #[serde(default = "d_provider_id")]
    pub provider_id: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Whole-request timeout for one streamed reply.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub startup_policy: LlmStartupPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_id: d_provider_id(),
            base_url: d_base_url(),
            model: d_model(),
            auth: AuthConfig::default(),
            timeout_ms: d_timeout_ms(),
            startup_policy: LlmStartupPolicy::AllowNone,
        }
    }
}

/// Controls how the gateway handles provider initialization at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmStartupPolicy {
    /// Boot even if the provider cannot be built. Every session then closes
    /// with an internal error until credentials are fixed.
    #[default]
    AllowNone,
    /// Abort startup if the provider cannot be built.
    RequireOne,
}

/// Where the API key comes from.
///
/// Precedence: plaintext `key` (discouraged), then the `env` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key: None,
            env: d_key_env(),
        }
    }
}

fn d_provider_id() -> String {
    "gemini".into()
}
fn d_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn d_model() -> String {
    "gemini-2.0-flash".into()
}
fn d_timeout_ms() -> u64 {
    120_000
}
fn d_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_gemini() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert_eq!(cfg.auth.env.as_deref(), Some("GEMINI_API_KEY"));
        assert_eq!(cfg.startup_policy, LlmStartupPolicy::AllowNone);
    }

    #[test]
    fn startup_policy_parses_snake_case() {
        let cfg: LlmConfig = toml::from_str(r#"startup_policy = "require_one""#).unwrap();
        assert_eq!(cfg.startup_policy, LlmStartupPolicy::RequireOne);
    }

    #[test]
    fn auth_key_is_not_serialized_when_absent() {
        let cfg = LlmConfig::default();
        let out = toml::to_string(&cfg).unwrap();
        assert!(!out.contains("key ="));
    }
}
