pub mod ask;
pub mod config;

use clap::{Parser, Subcommand};

/// threadline: resumable, tool-augmented model sessions over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "threadline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
    /// Open a session against a running gateway and print the answer.
    Ask {
        /// The prompt to send.
        prompt: String,
        /// Resume a previous thread.
        #[arg(long)]
        thread: Option<String>,
        /// Gateway session endpoint.
        #[arg(long, default_value = "ws://127.0.0.1:8080/v1/session")]
        url: String,
        /// IANA time zone to report (e.g. "Europe/Berlin").
        #[arg(long)]
        tz: Option<String>,
        /// Comma-separated actions this client supports.
        #[arg(long)]
        actions: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `TL_CONFIG` (or
/// `config.toml` by default). A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(tl_domain::config::Config, String)> {
    let config_path = std::env::var("TL_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(path: &str) -> anyhow::Result<tl_domain::config::Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(tl_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
