//! Single-writer outbound channel for a session.
//!
//! A dedicated task owns the WebSocket sink and drains a bounded queue,
//! so frames from the turn loop and from action handlers land whole and
//! in order. Every frame is acknowledged with the result of its socket
//! write; `send` only returns `Ok` once the frame reached the sink.

use std::borrow::Cow;

use axum::extract::ws::{CloseFrame, Message as WsMessage};
use futures_util::{Sink, SinkExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use tl_domain::error::{Error, Result};
use tl_domain::frame::{Frame, FrameSink};

enum Outgoing {
    Frame(Frame, oneshot::Sender<Result<()>>),
    Close { code: u16, reason: String },
}

pub struct SessionWriter {
    tx: mpsc::Sender<Outgoing>,
}

impl SessionWriter {
    /// Spawn the writer task over `sink`. The handle resolves once the
    /// close frame is written or the sink fails.
    pub fn spawn<S>(sink: S, buffer: usize) -> (Self, JoinHandle<()>)
    where
        S: Sink<WsMessage> + Send + Unpin + 'static,
        S::Error: std::fmt::Display,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let task = tokio::spawn(write_loop(sink, rx));
        (Self { tx }, task)
    }

    /// Queue a close frame. The writer stops after sending it.
    pub async fn close(&self, code: u16, reason: &str) {
        let _ = self
            .tx
            .send(Outgoing::Close {
                code,
                reason: reason.to_owned(),
            })
            .await;
    }
}

async fn write_loop<S>(mut sink: S, mut rx: mpsc::Receiver<Outgoing>)
where
    S: Sink<WsMessage> + Send + Unpin + 'static,
    S::Error: std::fmt::Display,
{
    while let Some(out) = rx.recv().await {
        match out {
            Outgoing::Frame(frame, ack) => {
                if let Err(e) = sink.send(WsMessage::Text(frame.encode())).await {
                    tracing::warn!(error = %e, "client write failed");
                    let _ = ack.send(Err(Error::Transport(format!("client write failed: {e}"))));
                    // Frames still queued are failed by dropping their acks.
                    return;
                }
                let _ = ack.send(Ok(()));
            }
            Outgoing::Close { code, reason } => {
                let close = WsMessage::Close(Some(CloseFrame {
                    code,
                    reason: Cow::Owned(reason),
                }));
                if let Err(e) = sink.send(close).await {
                    tracing::debug!(error = %e, "close frame not delivered");
                }
                return;
            }
        }
    }
}

#[async_trait::async_trait]
impl FrameSink for SessionWriter {
    async fn send(&self, frame: Frame) -> Result<()> {
        let closed = || Error::Transport("client connection closed".into());
        let (ack, written) = oneshot::channel();
        self.tx
            .send(Outgoing::Frame(frame, ack))
            .await
            .map_err(|_| closed())?;
        written.await.map_err(|_| closed())?
    }
}
