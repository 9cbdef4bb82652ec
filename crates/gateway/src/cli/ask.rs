//! `threadline ask`: a minimal session client.
//!
//! Content frames go to stdout as they arrive; tool notices and the final
//! thread id go to stderr so the answer can be piped.

use std::io::Write;

use anyhow::{bail, Context};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

use tl_domain::frame::Frame;

pub struct AskOptions {
    pub prompt: String,
    pub thread: Option<String>,
    pub url: String,
    pub tz: Option<String>,
    pub actions: Option<String>,
}

/// Build the session URL with the query parameters the gateway expects.
pub fn session_url(opts: &AskOptions) -> anyhow::Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(&opts.url).with_context(|| format!("invalid url {}", opts.url))?;
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("prompt", &opts.prompt);
        if let Some(thread) = &opts.thread {
            q.append_pair("threadId", thread);
        }
        if let Some(tz) = &opts.tz {
            q.append_pair("tz", tz);
        }
        if let Some(actions) = &opts.actions {
            q.append_pair("actions", actions);
        }
    }
    Ok(url)
}

/// Run one session and return the new thread id, if the gateway sent one.
pub async fn ask(opts: AskOptions) -> anyhow::Result<Option<String>> {
    let url = session_url(&opts)?;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {}", opts.url))?;

    let mut stdout = std::io::stdout();
    let mut thread_id = None;

    while let Some(msg) = socket.next().await {
        match msg.context("reading from gateway")? {
            Message::Text(text) => match Frame::decode(&text) {
                Some(Frame::Content(chunk)) => {
                    print!("{chunk}");
                    stdout.flush()?;
                }
                Some(Frame::ToolCall(summary)) => eprintln!("[{summary}]"),
                Some(Frame::Done) => println!(),
                Some(Frame::Thread(id)) => {
                    eprintln!("thread: {id}");
                    thread_id = Some(id.to_string());
                }
                None => tracing::debug!(frame = %text, "ignoring unknown frame"),
            },
            Message::Close(Some(frame)) if frame.code != CloseCode::Normal => {
                bail!("session failed ({}): {}", u16::from(frame.code), frame.reason);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(thread_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_query() {
        let url = session_url(&AskOptions {
            prompt: "What's 2+2?".into(),
            thread: Some("abc".into()),
            url: "ws://127.0.0.1:8080/v1/session".into(),
            tz: None,
            actions: Some("show_notice".into()),
        })
        .unwrap();
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:8080/v1/session?prompt=What%27s+2%2B2%3F&threadId=abc&actions=show_notice"
        );
    }
}
