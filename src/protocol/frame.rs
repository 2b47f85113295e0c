//! Draft-protocol text frames: `0x00 <utf-8 payload> 0xFF`.
//!
//! There is no length prefix and no escaping. The end marker can never occur
//! inside UTF-8 text, so every outbound message is representable; an inbound
//! payload that would need a raw 0xFF byte cannot be expressed on the wire.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Byte that opens every frame.
pub const FRAME_START: u8 = 0x00;

/// Byte that closes every frame.
pub const FRAME_END: u8 = 0xFF;

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Create a frame from raw payload bytes (without markers).
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Get the payload bytes.
    #[must_use]
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Borrow the payload as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if the payload is not valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.payload)?)
    }

    /// Consume the frame and return its payload as an owned string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if the payload is not valid UTF-8.
    pub fn into_text(self) -> Result<String> {
        String::from_utf8(self.payload.into()).map_err(|_| Error::InvalidUtf8)
    }

    /// Number of bytes this frame occupies on the wire.
    #[must_use]
    #[inline]
    pub fn wire_size(&self) -> usize {
        self.payload.len() + 2
    }
}

/// Encode a text message into a single wire frame.
#[must_use]
pub fn encode(message: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(message.len() + 2);
    buf.put_u8(FRAME_START);
    buf.put_slice(message.as_bytes());
    buf.put_u8(FRAME_END);
    buf.freeze()
}

/// Incremental frame splitter over a growing accumulation buffer.
///
/// Remembers how far the buffer has already been searched for an end marker,
/// so a large frame arriving over many reads is scanned once. Feed it the same
/// buffer each time, only appending between calls.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    scanned: usize,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the next complete frame off the front of `buffer`.
    ///
    /// Returns `Ok(None)` when no end marker has arrived yet; the bytes stay in
    /// `buffer` for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Framing`] if the bytes before the end marker do not
    /// begin with [`FRAME_START`] (including an end marker with nothing before
    /// it).
    pub fn decode(&mut self, buffer: &mut BytesMut) -> Result<Option<Frame>> {
        let from = self.scanned.min(buffer.len());
        let Some(offset) = buffer[from..].iter().position(|&b| b == FRAME_END) else {
            self.scanned = buffer.len();
            return Ok(None);
        };
        self.scanned = 0;

        let end = from + offset;
        let mut candidate = buffer.split_to(end + 1);
        candidate.truncate(end);

        match candidate.first() {
            Some(&FRAME_START) => {}
            Some(&other) => {
                return Err(Error::Framing(format!(
                    "frame starts with {other:#04x}, expected {FRAME_START:#04x}"
                )));
            }
            None => {
                return Err(Error::Framing(
                    "end marker without a preceding start marker".into(),
                ));
            }
        }

        Ok(Some(Frame {
            payload: candidate.split_off(1).freeze(),
        }))
    }

    /// Bytes of the current buffer already searched without finding an end
    /// marker.
    #[must_use]
    #[inline]
    pub fn scanned(&self) -> usize {
        self.scanned
    }
}

/// Split every complete frame off the front of `buffer`.
///
/// Returns the frames in wire order together with either the unconsumed tail
/// (the start of a frame whose end marker has not arrived yet) or the framing
/// error that stopped decoding. Frames that precede a violation are still
/// returned. The scan is a single forward pass; payload bytes are not copied.
pub fn decode(mut buffer: BytesMut) -> (Vec<Frame>, Result<BytesMut>) {
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();

    loop {
        match decoder.decode(&mut buffer) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => return (frames, Ok(buffer)),
            Err(e) => return (frames, Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(data: &[u8]) -> BytesMut {
        BytesMut::from(data)
    }

    #[test]
    fn test_encode_scenario() {
        assert_eq!(&encode("hi")[..], &[0x00, b'h', b'i', 0xFF]);
    }

    #[test]
    fn test_encode_empty_message() {
        assert_eq!(&encode("")[..], &[FRAME_START, FRAME_END]);
    }

    #[test]
    fn test_encode_multibyte_utf8() {
        let wire = encode("héllo ✓");
        assert_eq!(wire[0], FRAME_START);
        assert_eq!(wire[wire.len() - 1], FRAME_END);
        assert_eq!(&wire[1..wire.len() - 1], "héllo ✓".as_bytes());
        assert!(!wire[1..wire.len() - 1].contains(&FRAME_END));
    }

    fn decode_ok(data: BytesMut) -> (Vec<Frame>, BytesMut) {
        let (frames, rest) = decode(data);
        (frames, rest.unwrap())
    }

    #[test]
    fn test_decode_single_frame() {
        let (frames, rest) = decode_ok(buf(b"\x00hello\xff"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].text().unwrap(), "hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_multiple_frames() {
        let mut data = BytesMut::new();
        data.extend_from_slice(&encode("one"));
        data.extend_from_slice(&encode("two"));
        data.extend_from_slice(&encode(""));

        let (frames, rest) = decode_ok(data);
        let texts: Vec<_> = frames.iter().map(|f| f.text().unwrap()).collect();
        assert_eq!(texts, vec!["one", "two", ""]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_keeps_partial_tail() {
        let (frames, rest) = decode_ok(buf(b"\x00done\xff\x00part"));
        assert_eq!(frames, vec![Frame::new(&b"done"[..])]);
        assert_eq!(&rest[..], b"\x00part");
    }

    #[test]
    fn test_decode_incomplete_only() {
        let (frames, rest) = decode_ok(buf(b"\x00no end yet"));
        assert!(frames.is_empty());
        assert_eq!(&rest[..], b"\x00no end yet");
    }

    #[test]
    fn test_decode_empty_buffer() {
        let (frames, rest) = decode_ok(BytesMut::new());
        assert!(frames.is_empty());
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_resumes_after_more_bytes() {
        let (frames, mut rest) = decode_ok(buf(b"\x00hel"));
        assert!(frames.is_empty());

        rest.extend_from_slice(b"lo\xff");
        let (frames, rest) = decode_ok(rest);
        assert_eq!(frames[0].text().unwrap(), "hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_decode_missing_start_marker() {
        let (frames, result) = decode(buf(b"hello\xff"));
        assert!(frames.is_empty());
        assert!(matches!(result, Err(Error::Framing(msg)) if msg.contains("0x68")));
    }

    #[test]
    fn test_decode_bare_end_marker() {
        let (frames, result) = decode(buf(b"\xff"));
        assert!(frames.is_empty());
        assert!(matches!(result, Err(Error::Framing(_))));
    }

    #[test]
    fn test_decode_violation_after_valid_frame() {
        let (frames, result) = decode(buf(b"\x00good\xffjunk\xff\x00never\xff"));
        assert_eq!(frames, vec![Frame::new(&b"good"[..])]);
        assert!(matches!(result, Err(Error::Framing(msg)) if msg.contains("0x6a")));
    }

    #[test]
    fn test_decode_payload_may_contain_start_marker() {
        let (frames, _) = decode_ok(buf(b"\x00a\x00b\xff"));
        assert_eq!(frames[0].payload(), b"a\x00b");
    }

    #[test]
    fn test_decoder_resumes_scan_where_it_stopped() {
        let mut decoder = FrameDecoder::new();
        let mut buffer = buf(b"\x00abc");

        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
        assert_eq!(decoder.scanned(), 4);

        buffer.extend_from_slice(b"def");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
        assert_eq!(decoder.scanned(), 7);

        buffer.extend_from_slice(b"\xff\x00x");
        assert_eq!(
            decoder.decode(&mut buffer).unwrap(),
            Some(Frame::new(&b"abcdef"[..]))
        );
        assert_eq!(decoder.scanned(), 0);
        assert_eq!(&buffer[..], b"\x00x");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
        assert_eq!(decoder.scanned(), 2);
    }

    #[test]
    fn test_decoder_yields_frames_one_at_a_time() {
        let mut decoder = FrameDecoder::new();
        let mut buffer = buf(b"\x00a\xff\x00b\xffbad\xff");

        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(Frame::new(&b"a"[..])));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(Frame::new(&b"b"[..])));
        assert!(matches!(decoder.decode(&mut buffer), Err(Error::Framing(_))));
    }

    #[test]
    fn test_into_text_rejects_invalid_utf8() {
        let frame = Frame::new(vec![0xC3, 0x28]);
        assert!(matches!(frame.text(), Err(Error::InvalidUtf8)));
        assert!(matches!(frame.into_text(), Err(Error::InvalidUtf8)));
    }

    #[test]
    fn test_wire_size() {
        let frame = Frame::new(&b"abc"[..]);
        assert_eq!(frame.wire_size(), 5);
        assert_eq!(encode("abc").len(), frame.wire_size());
    }
}
