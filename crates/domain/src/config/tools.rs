use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Built-in tools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Zone used when the client does not send `tz`.
    #[serde(default = "d_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub web_fetch: WebFetchConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_timezone: d_timezone(),
            web_fetch: WebFetchConfig::default(),
        }
    }
}

/// Limits for the `web_fetch` function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFetchConfig {
    #[serde(default = "d_timeout_secs")]
    pub timeout_secs: u64,
    /// Responses larger than this are truncated.
    #[serde(default = "d_max_bytes")]
    pub max_bytes: usize,
    /// Cap on extracted text returned to the model.
    #[serde(default = "d_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: d_timeout_secs(),
            max_bytes: d_max_bytes(),
            max_text_chars: d_max_text_chars(),
        }
    }
}

fn d_timezone() -> String {
    "UTC".into()
}
fn d_timeout_secs() -> u64 {
    20
}
fn d_max_bytes() -> usize {
    2 * 1024 * 1024
}
fn d_max_text_chars() -> usize {
    20_000
}
