//! Shared utility functions for provider adapters.

use tl_domain::config::AuthConfig;
use tl_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext, warns)
/// 2. `env` field (reads environment variable)
/// 3. Error
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key'; prefer 'env' instead"
        );
        return Ok(key.clone());
    }

    if let Some(ref env_var) = auth.env {
        return match std::env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            Ok(_) => Err(Error::Auth(format!("environment variable '{env_var}' is empty"))),
            Err(_) => Err(Error::Auth(format!(
                "environment variable '{env_var}' not set or not valid UTF-8"
            ))),
        };
    }

    Err(Error::Auth(
        "no API key configured: set 'key' or 'env' in [llm.auth]".into(),
    ))
}

/// Redact the `key=` query parameter from a URL for safe logging.
pub(crate) fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_plaintext() {
        let auth = AuthConfig {
            key: Some("sk-inline".into()),
            env: Some("TL_TEST_UNUSED_ENV".into()),
        };
        assert_eq!(resolve_api_key(&auth).unwrap(), "sk-inline");
    }

    #[test]
    fn resolve_api_key_from_env() {
        std::env::set_var("TL_TEST_RESOLVE_KEY", "from-env");
        let auth = AuthConfig {
            key: None,
            env: Some("TL_TEST_RESOLVE_KEY".into()),
        };
        assert_eq!(resolve_api_key(&auth).unwrap(), "from-env");
        std::env::remove_var("TL_TEST_RESOLVE_KEY");
    }

    #[test]
    fn resolve_api_key_missing_env_is_auth_error() {
        let auth = AuthConfig {
            key: None,
            env: Some("TL_TEST_DEFINITELY_NOT_SET_42".into()),
        };
        assert!(matches!(resolve_api_key(&auth), Err(Error::Auth(_))));
    }

    #[test]
    fn resolve_api_key_no_source() {
        let auth = AuthConfig { key: None, env: None };
        assert!(matches!(resolve_api_key(&auth), Err(Error::Auth(_))));
    }

    #[test]
    fn redact_hides_key_but_keeps_other_params() {
        let url = "https://x/v1beta/models/m:streamGenerateContent?alt=sse&key=secret&foo=1";
        assert_eq!(
            redact_url_key(url),
            "https://x/v1beta/models/m:streamGenerateContent?alt=sse&key=[REDACTED]&foo=1"
        );
        assert_eq!(redact_url_key("https://x/"), "https://x/");
    }
}
