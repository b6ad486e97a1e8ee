//! Frame encoding and single-line decoding

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::ingest::EventRecord;

/// Bare frame tag
pub const FRAME_TAG: &[u8] = b"NEW";

/// Prefix of a frame that carries a payload
pub const FRAME_PREFIX: &[u8] = b"NEW|";

/// A decoded record as seen by the consumer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Payload text (empty for a bare `NEW`)
    pub text: String,
}

impl Frame {
    /// Create a frame with the given payload
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Whether the frame has no payload
    pub fn is_bare(&self) -> bool {
        self.text.is_empty()
    }

    /// Encode this frame for the wire
    pub fn encode(&self) -> Bytes {
        encode_frame(&self.text)
    }
}

impl From<&EventRecord> for Frame {
    fn from(record: &EventRecord) -> Self {
        Self::new(sanitize_text(&record.text))
    }
}

/// Make text safe to place on a single line.
///
/// `\n` becomes the two characters `\` `n`, `\r` is dropped.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Encode a payload into a complete, newline-terminated frame.
///
/// Text that is empty once sanitized is sent as a bare `NEW` line.
pub fn encode_frame(text: &str) -> Bytes {
    let text = sanitize_text(text);

    if text.is_empty() {
        let mut buf = BytesMut::with_capacity(FRAME_TAG.len() + 1);
        buf.put_slice(FRAME_TAG);
        buf.put_u8(b'\n');
        return buf.freeze();
    }

    let mut buf = BytesMut::with_capacity(FRAME_PREFIX.len() + text.len() + 1);
    buf.put_slice(FRAME_PREFIX);
    buf.put_slice(text.as_bytes());
    buf.put_u8(b'\n');
    buf.freeze()
}

/// Decode one line (without its `\n` separator).
///
/// Returns `Ok(None)` for an empty line. A trailing `\r` is tolerated.
pub fn decode_line(line: &[u8]) -> Result<Option<Frame>, ProtocolError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    if line.is_empty() {
        return Ok(None);
    }

    if let Some(payload) = line.strip_prefix(FRAME_PREFIX) {
        return Ok(Some(Frame::new(String::from_utf8_lossy(payload))));
    }

    if line == FRAME_TAG {
        return Ok(Some(Frame::default()));
    }

    Err(ProtocolError::UnrecognizedFrame(
        String::from_utf8_lossy(line).into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_payload() {
        assert_eq!(&encode_frame("hello world")[..], b"NEW|hello world\n");
    }

    #[test]
    fn test_encode_empty_is_bare() {
        assert_eq!(&encode_frame("")[..], b"NEW\n");
        assert_eq!(&encode_frame("\r")[..], b"NEW\n");
        assert_eq!(&encode_frame("\r\r")[..], b"NEW\n");
        assert_eq!(&Frame::default().encode()[..], b"NEW\n");
    }

    #[test]
    fn test_encode_strips_line_breaks() {
        let encoded = encode_frame("line one\r\nline two\nend");
        assert_eq!(&encoded[..], b"NEW|line one\\nline two\\nend\n");

        // exactly one separator, at the end
        assert_eq!(encoded.iter().filter(|b| **b == b'\n').count(), 1);
        assert!(!encoded.contains(&b'\r'));
    }

    #[test]
    fn test_round_trip_normalizes_newlines() {
        let texts = ["a\nb", "\n\n", "trailing\r\n", "unicode \u{1F600}\nok", "plain"];
        for text in texts {
            let encoded = encode_frame(text);
            let line = &encoded[..encoded.len() - 1];
            let frame = decode_line(line).unwrap().unwrap();
            assert_eq!(frame.text, sanitize_text(text));
            assert!(!frame.text.contains('\n'));
        }
    }

    #[test]
    fn test_decode_variants() {
        assert_eq!(decode_line(b"NEW|hi").unwrap(), Some(Frame::new("hi")));
        assert_eq!(decode_line(b"NEW").unwrap(), Some(Frame::default()));
        assert_eq!(decode_line(b"NEW|").unwrap(), Some(Frame::default()));
        assert_eq!(decode_line(b"NEW|a|b").unwrap(), Some(Frame::new("a|b")));
        assert_eq!(decode_line(b"NEW|crlf\r").unwrap(), Some(Frame::new("crlf")));
        assert_eq!(decode_line(b"").unwrap(), None);
        assert_eq!(decode_line(b"\r").unwrap(), None);
    }

    #[test]
    fn test_decode_unrecognized() {
        for line in [&b"HELLO"[..], &b"NEWS"[..], &b"new|lower"[..], &b" NEW|x"[..]] {
            assert!(matches!(
                decode_line(line),
                Err(ProtocolError::UnrecognizedFrame(_))
            ));
        }
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let frame = decode_line(b"NEW|ok\xff").unwrap().unwrap();
        assert!(frame.text.starts_with("ok"));
    }

    #[test]
    fn test_frame_from_record() {
        let record = EventRecord::new("multi\nline", vec![], "cid");
        assert_eq!(Frame::from(&record).text, "multi\\nline");
    }
}
