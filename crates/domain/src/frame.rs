//! Outbound framing protocol.
//!
//! Every message sent to the client is one text frame whose first byte is
//! a tag:
//!
//! | tag | meaning                 | payload                       |
//! |-----|-------------------------|-------------------------------|
//! | `c` | content delta           | raw text chunk                |
//! | `f` | tool-call notice        | human-readable call summary   |
//! | `d` | turn done, no tool call | empty                         |
//! | `t` | session complete        | the new thread identifier     |

use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Content(String),
    ToolCall(String),
    Done,
    Thread(Uuid),
}

impl Frame {
    pub fn tag(&self) -> char {
        match self {
            Frame::Content(_) => 'c',
            Frame::ToolCall(_) => 'f',
            Frame::Done => 'd',
            Frame::Thread(_) => 't',
        }
    }

    /// Render the frame as the text sent over the wire.
    pub fn encode(&self) -> String {
        match self {
            Frame::Content(text) => format!("c{text}"),
            Frame::ToolCall(summary) => format!("f{summary}"),
            Frame::Done => "d".to_owned(),
            Frame::Thread(id) => format!("t{id}"),
        }
    }

    /// Parse a wire frame. Returns `None` for unknown tags or a malformed
    /// thread id.
    pub fn decode(raw: &str) -> Option<Frame> {
        let mut chars = raw.chars();
        let tag = chars.next()?;
        let payload = chars.as_str();
        match tag {
            'c' => Some(Frame::Content(payload.to_owned())),
            'f' => Some(Frame::ToolCall(payload.to_owned())),
            'd' => Some(Frame::Done),
            't' => Uuid::parse_str(payload).ok().map(Frame::Thread),
            _ => None,
        }
    }
}

/// The write half of a session's outbound channel.
///
/// Implementations must serialize writes so each frame lands atomically
/// and in call order, even when an action handler writes concurrently
/// with the turn loop.
#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    async fn send(&self, frame: Frame) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_tag() {
        assert_eq!(Frame::Content("4".into()).encode(), "c4");
        assert_eq!(Frame::ToolCall("Checking the time".into()).encode(), "fChecking the time");
        assert_eq!(Frame::Done.encode(), "d");
        let id = Uuid::nil();
        assert_eq!(
            Frame::Thread(id).encode(),
            "t00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn decode_reads_what_encode_wrote() {
        let id = Uuid::new_v4();
        for frame in [
            Frame::Content("partial tex".into()),
            Frame::ToolCall("Fetching example.com".into()),
            Frame::Done,
            Frame::Thread(id),
        ] {
            assert_eq!(Frame::decode(&frame.encode()), Some(frame));
        }
    }

    #[test]
    fn decode_rejects_unknown_tag_and_bad_thread() {
        assert_eq!(Frame::decode("xnope"), None);
        assert_eq!(Frame::decode(""), None);
        assert_eq!(Frame::decode("tnot-a-uuid"), None);
    }

    #[test]
    fn content_payload_keeps_multibyte_text() {
        assert_eq!(
            Frame::decode("cé — ü"),
            Some(Frame::Content("é — ü".into()))
        );
    }
}
