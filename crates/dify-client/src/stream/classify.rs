//! Per-line classification of event-stream input.

use crate::error::UpstreamError;

/// Prefix of a line carrying event data.
pub const DATA_PREFIX: &[u8] = b"data:";

/// What a single line of the stream turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedFrame<'a> {
    /// Blank lines, `:` comments, `event:` lines and anything unprefixed.
    Ignorable,
    /// A bare JSON error object sent in place of event data.
    ErrorFrame(UpstreamError),
    /// The payload of a `data:` line, surrounding whitespace removed.
    DataFrame(&'a [u8]),
}

/// Classify one line of the stream.
///
/// Only the first line of a session is checked for a bare error object; the
/// service uses that to reject a request after the stream has been opened.
/// A `data:` line with an empty payload is still a data frame; decoding it
/// fails and ends the session.
pub fn classify(line: &[u8], first_line: bool) -> ClassifiedFrame<'_> {
    if first_line {
        if let Some(err) = parse_error_frame(line) {
            return ClassifiedFrame::ErrorFrame(err);
        }
    }

    match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => ClassifiedFrame::DataFrame(rest.trim_ascii()),
        None => ClassifiedFrame::Ignorable,
    }
}

fn parse_error_frame(line: &[u8]) -> Option<UpstreamError> {
    let line = line.trim_ascii();
    if !line.starts_with(b"{") {
        return None;
    }
    serde_json::from_slice(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_line() {
        assert_eq!(
            classify(br#"data: {"event":"ping"}"#, false),
            ClassifiedFrame::DataFrame(br#"{"event":"ping"}"#)
        );
        assert_eq!(
            classify(b"data:{}  ", false),
            ClassifiedFrame::DataFrame(b"{}")
        );
    }

    #[test]
    fn test_ignorable_lines() {
        assert_eq!(classify(b"", false), ClassifiedFrame::Ignorable);
        assert_eq!(classify(b": keep-alive", false), ClassifiedFrame::Ignorable);
        assert_eq!(classify(b"event: ping", false), ClassifiedFrame::Ignorable);
        assert_eq!(classify(b" data: {}", false), ClassifiedFrame::Ignorable);
    }

    #[test]
    fn test_empty_data_line_is_a_frame() {
        assert_eq!(classify(b"data:", false), ClassifiedFrame::DataFrame(b""));
        assert_eq!(classify(b"data:   ", false), ClassifiedFrame::DataFrame(b""));
    }

    #[test]
    fn test_error_frame_on_first_line() {
        match classify(br#"{"code":"500","message":"boom"}"#, true) {
            ClassifiedFrame::ErrorFrame(err) => {
                assert_eq!(err.code, "500");
                assert_eq!(err.message, "boom");
            }
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    #[test]
    fn test_error_frame_with_params_and_status() {
        let line =
            br#"{"code":"invalid_param","message":"query is required","params":"query","status":400}"#;
        match classify(line, true) {
            ClassifiedFrame::ErrorFrame(err) => {
                assert_eq!(err.params.as_deref(), Some("query"));
                assert_eq!(err.status, Some(400));
            }
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    #[test]
    fn test_error_shape_only_detected_on_first_line() {
        let line = br#"{"code":"500","message":"boom"}"#;
        assert_eq!(classify(line, false), ClassifiedFrame::Ignorable);
    }

    #[test]
    fn test_first_line_json_without_error_shape_is_ignorable() {
        assert_eq!(
            classify(br#"{"event":"message"}"#, true),
            ClassifiedFrame::Ignorable
        );
    }

    #[test]
    fn test_first_line_data_frame_is_not_an_error() {
        assert_eq!(
            classify(br#"data: {"event":"message"}"#, true),
            ClassifiedFrame::DataFrame(br#"{"event":"message"}"#)
        );
    }
}
