use serde::{Deserialize, Deserializer, Serialize};

/// Query parameters a client sends when opening a session.
///
/// `actions` arrives as a comma-separated list (`actions=show_notice,beep`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub actions: Vec<String>,
}

impl SessionQuery {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// The prior thread to restore, ignoring an empty `threadId=`.
    pub fn prior_thread(&self) -> Option<&str> {
        self.thread_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Client time zone, if one was sent.
    pub fn time_zone(&self) -> Option<&str> {
        self.tz.as_deref().map(str::trim).filter(|tz| !tz.is_empty())
    }
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_keys() {
        let q: SessionQuery = serde_json::from_value(serde_json::json!({
            "prompt": "hi",
            "threadId": "abc",
            "tz": "Europe/Paris",
            "actions": "show_notice, beep,,",
        }))
        .unwrap();
        assert_eq!(q.prompt, "hi");
        assert_eq!(q.prior_thread(), Some("abc"));
        assert_eq!(q.time_zone(), Some("Europe/Paris"));
        assert_eq!(q.actions, vec!["show_notice", "beep"]);
    }

    #[test]
    fn blank_thread_id_means_no_prior_thread() {
        let q: SessionQuery =
            serde_json::from_value(serde_json::json!({"prompt": "hi", "threadId": "  "})).unwrap();
        assert_eq!(q.prior_thread(), None);
        assert!(q.actions.is_empty());
    }
}
