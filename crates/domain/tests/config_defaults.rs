use tl_domain::config::{Config, ThreadBackend};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn empty_file_parses_to_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.session.max_tool_rounds, 10);
    assert_eq!(config.threads.ttl_secs, 600);
    assert_eq!(config.threads.backend, ThreadBackend::Memory);
    assert_eq!(config.llm.model, "gemini-2.0-flash");
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 9090

[llm]
model = "gemini-2.5-flash"
timeout_ms = 30000

[llm.auth]
env = "MY_GEMINI_KEY"

[session]
max_tool_rounds = 4
temperature = 0.2

[threads]
backend = "file"
dir = "/tmp/threads"
ttl_secs = 120

[tools]
default_timezone = "Europe/Berlin"

[tools.web_fetch]
max_text_chars = 1000
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.llm.model, "gemini-2.5-flash");
    assert_eq!(config.llm.auth.env.as_deref(), Some("MY_GEMINI_KEY"));
    assert_eq!(config.session.max_tool_rounds, 4);
    assert_eq!(config.threads.backend, ThreadBackend::File);
    assert_eq!(config.threads.ttl_secs, 120);
    assert_eq!(config.tools.default_timezone, "Europe/Berlin");
    assert_eq!(config.tools.web_fetch.max_text_chars, 1000);
    assert_eq!(config.tools.web_fetch.timeout_secs, 20);
    assert!(config.validate().is_empty());
}

#[test]
fn unknown_backend_is_rejected() {
    let result: Result<Config, _> = toml::from_str("[threads]\nbackend = \"redis\"\n");
    assert!(result.is_err());
}
