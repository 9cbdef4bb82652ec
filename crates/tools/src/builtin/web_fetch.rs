//! `web_fetch`: fetch a URL with hard limits and hand readable text to
//! the model.
//!
//! - Request timeout and response size cap come from `[tools.web_fetch]`
//! - At most 5 redirects
//! - HTML is reduced to text; other text types pass through truncated

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::{json, Value};
use tl_domain::config::WebFetchConfig;
use tl_domain::tool::ToolDefinition;

use crate::context::ToolContext;
use crate::registry::Tool;

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/json,text/plain";

pub struct WebFetchTool {
    client: reqwest::Client,
    max_bytes: usize,
    max_text_chars: usize,
}

impl WebFetchTool {
    pub fn new(cfg: &WebFetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("build reqwest client for web_fetch")?;

        Ok(Self {
            client,
            max_bytes: cfg.max_bytes,
            max_text_chars: cfg.max_text_chars,
        })
    }

    fn truncate(&self, text: &str) -> String {
        text.chars().take(self.max_text_chars).collect()
    }
}

/// Tag-stripping HTML reduction. Drops `<script>`/`<style>` bodies,
/// breaks lines at block elements, decodes the common entities and
/// collapses runs of blank lines.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut out_chars = 0usize;
    let mut in_tag = false;
    let mut tag_buf = String::new();
    let mut skip_until: Option<&'static str> = None;

    for ch in html.chars() {
        if out_chars >= max_chars {
            break;
        }
        match ch {
            '<' if !in_tag => {
                in_tag = true;
                tag_buf.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag_name(&tag_buf);
                match name.as_str() {
                    "script" => skip_until = Some("/script"),
                    "style" => skip_until = Some("/style"),
                    other if skip_until == Some(other) => skip_until = None,
                    _ => {}
                }
                if skip_until.is_none() && is_line_break(&name) && !out.ends_with('\n') {
                    out.push('\n');
                    out_chars += 1;
                }
            }
            _ if in_tag => tag_buf.push(ch),
            _ if skip_until.is_some() => {}
            _ => {
                out.push(ch);
                out_chars += 1;
            }
        }
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let mut result = String::new();
    let mut blank_run = false;
    for line in decoded.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            if !blank_run && !result.is_empty() {
                result.push('\n');
            }
            blank_run = true;
        } else {
            result.push_str(&line);
            result.push('\n');
            blank_run = false;
        }
    }
    result.trim().to_string()
}

/// Lower-cased element name, keeping a leading `/` for closing tags.
fn tag_name(raw: &str) -> String {
    let raw = raw.trim();
    let (closing, rest) = match raw.strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", raw),
    };
    let name = rest
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("");
    format!("{closing}{}", name.to_ascii_lowercase())
}

fn is_line_break(tag: &str) -> bool {
    matches!(
        tag.trim_start_matches('/'),
        "p" | "div" | "br" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            | "article" | "section" | "header" | "footer" | "blockquote"
    )
}

#[async_trait::async_trait]
impl Tool for WebFetchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "web_fetch".into(),
            description: "Fetch a web page or document and return its readable text.".into(),
            parameters: json!({
                "type": "object",
                "required": ["url"],
                "properties": {
                    "url": { "type": "string", "description": "Absolute http(s) URL" },
                    "extract_text": {
                        "type": "boolean",
                        "description": "Reduce HTML to plain text (default true)"
                    }
                }
            }),
        }
    }

    fn summarise(&self, args: &Value) -> String {
        let host = args
            .get("url")
            .and_then(|v| v.as_str())
            .and_then(|u| reqwest::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_owned));
        match host {
            Some(host) => format!("Reading {host}"),
            None => "Reading a web page".into(),
        }
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<String> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("missing args.url"))?;
        let parsed = reqwest::Url::parse(url).with_context(|| format!("invalid url {url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("unsupported scheme: {}", parsed.scheme());
        }
        let extract_text = args
            .get("extract_text")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let resp = self
            .client
            .get(parsed)
            .header(USER_AGENT, concat!("threadline/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, DEFAULT_ACCEPT)
            .send()
            .await
            .with_context(|| format!("fetch {url}"))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut body = resp.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if buf.len() + chunk.len() > self.max_bytes {
                bail!("response exceeded {} bytes", self.max_bytes);
            }
            buf.extend_from_slice(&chunk);
        }

        let raw = String::from_utf8_lossy(&buf);
        let text = if extract_text && content_type.contains("html") {
            html_to_text(&raw, self.max_text_chars)
        } else if content_type.is_empty()
            || content_type.contains("json")
            || content_type.starts_with("text/")
        {
            self.truncate(&raw)
        } else {
            String::new()
        };

        Ok(json!({
            "url": url,
            "status": status,
            "content_type": content_type,
            "bytes": buf.len(),
            "text": text,
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> WebFetchTool {
        WebFetchTool::new(&WebFetchConfig::default()).unwrap()
    }

    #[test]
    fn strips_tags_scripts_and_styles() {
        let html = "<html><head><style>p{color:red}</style></head><body>\
                    <h1>Hello</h1><p>World</p><script type=\"x\">var x=1;</script>\
                    <p>after</p></body></html>";
        let text = html_to_text(html, 10_000);
        assert_eq!(text, "Hello\nWorld\nafter");
    }

    #[test]
    fn decodes_entities_once() {
        assert_eq!(html_to_text("<p>A &amp; B &lt; C &amp;lt;</p>", 100), "A & B < C &lt;");
    }

    #[test]
    fn respects_char_limit() {
        let text = html_to_text("<p>This is a very long text that should be truncated</p>", 10);
        assert_eq!(text, "This is a");
    }

    #[test]
    fn summary_names_the_host() {
        let t = tool();
        assert_eq!(
            t.summarise(&json!({"url": "https://example.com/a?b=c"})),
            "Reading example.com"
        );
        assert_eq!(t.summarise(&json!({})), "Reading a web page");
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        use std::sync::Arc;
        use tl_domain::query::SessionQuery;
        use tokio_util::sync::CancellationToken;

        let ctx = ToolContext::new(CancellationToken::new(), Arc::new(SessionQuery::new("x")));
        let err = tool()
            .call(&ctx, json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported scheme: file");
    }
}
