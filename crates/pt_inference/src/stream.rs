use pt_core::{Error, Result};
use serde_json::Value;

const SSE_EVENT_SEPARATOR: &[u8] = b"\n\n";

#[derive(Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Skip,
}

/// Drain complete SSE events from `buffer` and return their joined `data:` payloads.
///
/// Incomplete trailing events stay in the buffer. Events are split on raw
/// bytes so a multi-byte character cut across network chunks is decoded only
/// once it is whole.
pub fn drain_sse_events(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut events = Vec::new();

    while let Some(idx) = find_separator(buffer) {
        let raw: Vec<u8> = buffer.drain(..idx + SSE_EVENT_SEPARATOR.len()).collect();
        let event = String::from_utf8_lossy(&raw[..idx]);

        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .collect();

        if !data.is_empty() {
            events.push(data.join("\n"));
        }
    }

    events
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(SSE_EVENT_SEPARATOR.len())
        .position(|window| window == SSE_EVENT_SEPARATOR)
}

pub fn parse_stream_event(provider: &str, data: &str) -> Result<StreamEvent> {
    if data == "[DONE]" {
        return Ok(StreamEvent::Done);
    }

    let payload: Value = serde_json::from_str(data).map_err(|e| {
        Error::Parse(format!("Failed to parse {} stream payload: {}", provider, e))
    })?;

    if let Some(message) = crate::models::compat::error_message(&payload) {
        return Err(Error::upstream(provider, None, message));
    }

    Ok(payload
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(|text| StreamEvent::Delta(text.to_string()))
        .unwrap_or(StreamEvent::Skip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_incomplete_event() {
        let mut buffer = b"data: one\n\ndata: tw".to_vec();
        assert_eq!(drain_sse_events(&mut buffer), vec!["one".to_string()]);
        assert_eq!(buffer, b"data: tw");

        buffer.extend_from_slice(b"o\n\n");
        assert_eq!(drain_sse_events(&mut buffer), vec!["two".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_ignores_comments_and_empty_events() {
        let mut buffer = b": keep-alive\n\nevent: ping\n\ndata: [DONE]\n\n".to_vec();
        assert_eq!(drain_sse_events(&mut buffer), vec!["[DONE]".to_string()]);
    }

    #[test]
    fn test_split_multibyte_char_is_not_mangled() {
        let event = "data: caf\u{e9}\n\n".as_bytes().to_vec();
        let (head, tail) = event.split_at(10);
        let mut buffer = head.to_vec();
        assert!(drain_sse_events(&mut buffer).is_empty());
        buffer.extend_from_slice(tail);
        assert_eq!(drain_sse_events(&mut buffer), vec!["caf\u{e9}".to_string()]);
    }

    #[test]
    fn test_parse_stream_event_variants() {
        assert_eq!(parse_stream_event("xAI", "[DONE]").unwrap(), StreamEvent::Done);
        assert_eq!(
            parse_stream_event("xAI", r#"{"choices":[{"delta":{"content":"hi"}}]}"#).unwrap(),
            StreamEvent::Delta("hi".to_string())
        );
        assert_eq!(
            parse_stream_event("xAI", r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            StreamEvent::Skip
        );
        assert!(parse_stream_event("xAI", "not json").is_err());
        assert!(parse_stream_event("xAI", r#"{"error":"boom"}"#).is_err());
    }
}
