//! Server-sent-events plumbing for streamed replies.
//!
//! The response body arrives in arbitrary chunks. Bytes are buffered until
//! a blank line closes an event, and only then decoded, so multi-byte
//! characters split across chunks survive. Both `\n\n` and `\r\n\r\n`
//! delimiters are accepted.

use crate::util::from_reqwest;
use tl_domain::error::Result;
use tl_domain::stream::{BoxStream, StreamEvent};

/// Find the end of the first complete event block.
/// Returns `(block_len, delimiter_len)`.
fn next_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Pull every complete `data:` payload out of `buffer`, leaving any
/// trailing partial event in place. Multi-line `data:` fields within one
/// event are joined with `\n`.
pub(crate) fn drain_data_payloads(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some((len, delim)) = next_event_boundary(buffer) {
        let block: Vec<u8> = buffer.drain(..len + delim).take(len).collect();
        let text = String::from_utf8_lossy(&block);

        let data: Vec<&str> = text
            .lines()
            .filter_map(|line| line.trim_end_matches('\r').strip_prefix("data:"))
            .map(str::trim)
            .collect();
        let joined = data.join("\n");
        if !joined.trim().is_empty() {
            payloads.push(joined);
        }
    }

    payloads
}

/// Build a [`BoxStream`] from an SSE response and a parser closure.
///
/// The closure is `FnMut` so a parser may carry state between payloads
/// (the Gemini parser remembers the latest usage report). When the body
/// closes without the parser having produced `Done`, a bare `Done` is
/// appended so consumers always see an explicit end.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer: Vec<u8> = Vec::new();
        let mut done_emitted = false;

        loop {
            let chunk = response.chunk().await;
            let at_eof = matches!(chunk, Ok(None));
            match chunk {
                Ok(Some(bytes)) => buffer.extend_from_slice(&bytes),
                Ok(None) => {
                    if !buffer.iter().all(u8::is_ascii_whitespace) {
                        buffer.extend_from_slice(b"\n\n");
                    }
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    return;
                }
            }

            for data in drain_data_payloads(&mut buffer) {
                for event in parse_data(&data) {
                    if matches!(&event, Ok(StreamEvent::Done { .. })) {
                        done_emitted = true;
                    }
                    yield event;
                }
            }

            if at_eof {
                break;
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: None,
            });
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn drains_lf_delimited_events() {
        let mut b = buf("data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(drain_data_payloads(&mut b), vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(b.is_empty());
    }

    #[test]
    fn drains_crlf_delimited_events() {
        let mut b = buf("data: first\r\n\r\ndata: second\r\n\r\n");
        assert_eq!(drain_data_payloads(&mut b), vec!["first", "second"]);
        assert!(b.is_empty());
    }

    #[test]
    fn partial_event_stays_buffered() {
        let mut b = buf("data: complete\n\ndata: partial");
        assert_eq!(drain_data_payloads(&mut b), vec!["complete"]);
        assert_eq!(b, buf("data: partial"));
    }

    #[test]
    fn multibyte_char_split_across_chunks_is_preserved() {
        let full = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let split = full.iter().position(|&c| c == 0xC3).unwrap() + 1;
        let mut b = full[..split].to_vec();
        assert!(drain_data_payloads(&mut b).is_empty());
        b.extend_from_slice(&full[split..]);
        assert_eq!(drain_data_payloads(&mut b), vec!["{\"text\":\"héllo\"}"]);
    }

    #[test]
    fn non_data_fields_are_ignored() {
        let mut b = buf("event: ping\nid: 7\nretry: 100\ndata: payload\n\n");
        assert_eq!(drain_data_payloads(&mut b), vec!["payload"]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut b = buf("data: line one\ndata: line two\n\n");
        assert_eq!(drain_data_payloads(&mut b), vec!["line one\nline two"]);
    }

    #[test]
    fn empty_data_is_skipped() {
        let mut b = buf("data: \n\n");
        assert!(drain_data_payloads(&mut b).is_empty());
        assert!(b.is_empty());
    }
}
