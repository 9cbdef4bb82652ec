//! Per-session system prompt.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tl_domain::query::SessionQuery;

/// Renders the configured base prompt plus the client's local date and
/// time and the actions its device supports.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    template: String,
    default_zone: Tz,
}

impl SystemPrompt {
    pub fn new(template: impl Into<String>, default_timezone: &str) -> Self {
        let default_zone = default_timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(zone = default_timezone, "unknown default time zone, using UTC");
            Tz::UTC
        });
        Self {
            template: template.into(),
            default_zone,
        }
    }

    pub fn build(&self, query: &SessionQuery, now: DateTime<Utc>) -> String {
        let zone = query
            .time_zone()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(self.default_zone);
        let local = now.with_timezone(&zone);

        let mut prompt = self.template.trim_end().to_owned();
        prompt.push_str("\n\n");
        prompt.push_str(&format!(
            "The current date and time is {} ({}).",
            local.format("%A, %-d %B %Y, %H:%M"),
            zone.name()
        ));
        if !query.actions.is_empty() {
            prompt.push_str(&format!(
                "\nThe user's device supports these actions: {}.",
                query.actions.join(", ")
            ));
        }
        prompt
    }
}
