use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session / turn loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of iterations that offer the tool catalog. Later iterations
    /// are sent without tools so the conversation has to wind down.
    #[serde(default = "d_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    /// Base system prompt; date, time zone and client capabilities are
    /// appended per session.
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,
    /// Frames queued for the socket writer before the loop waits.
    #[serde(default = "d_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: d_max_tool_rounds(),
            temperature: d_temperature(),
            system_prompt: d_system_prompt(),
            outbound_buffer: d_outbound_buffer(),
        }
    }
}

fn d_max_tool_rounds() -> u32 {
    10
}
fn d_temperature() -> f32 {
    0.5
}
fn d_system_prompt() -> String {
    "You are a helpful assistant running on a small screen. \
     Keep answers short and plain: no markdown tables, no images. \
     Use the available functions when they give a better answer than guessing."
        .into()
}
fn d_outbound_buffer() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_rounds_default_to_ten() {
        let cfg: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_tool_rounds, 10);
        assert!((cfg.temperature - 0.5).abs() < f32::EPSILON);
    }
}
