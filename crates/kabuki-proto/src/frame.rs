//! ---
//! kabuki_section: "02-messaging-transport"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Frame codec and command vocabulary."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use bytes::{BufMut, Bytes, BytesMut};

use crate::{ProtocolError, Result};

/// Number of ASCII decimal bytes in the fixed-width length header.
pub const HEADER_LEN: usize = 4;

/// Upper bound on the body carried by a single frame.
pub const MAX_BODY_LEN: usize = 512;

/// One length-prefixed unit of application data on the wire.
///
/// A frame owns only its body; the header is derived from the body length
/// at encode time. Construction enforces the body bound, so every `Frame`
/// in existence is encodable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    body: Vec<u8>,
}

impl Frame {
    /// Construct a frame, rejecting bodies above [`MAX_BODY_LEN`].
    pub fn new(body: impl Into<Vec<u8>>) -> Result<Self> {
        let body = body.into();
        if body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLarge { length: body.len() });
        }
        Ok(Self { body })
    }

    /// Construct a frame from a textual command body.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::new(text.as_bytes())
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body length in bytes.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Body interpreted as UTF-8 command text.
    pub fn body_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(ProtocolError::from)
    }

    /// Serialize the frame as header followed by exactly `body_len` bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.body.len());
        buf.put_slice(&encode_header(self.body.len()));
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

/// Encode a body length as fixed-width zero-padded decimal header bytes.
///
/// Lengths are bounded at [`Frame`] construction; calling this with a
/// length above [`MAX_BODY_LEN`] is a contract violation.
pub fn encode_header(len: usize) -> [u8; HEADER_LEN] {
    assert!(len <= MAX_BODY_LEN, "header length {len} out of range");
    let digits = format!("{len:0width$}", width = HEADER_LEN);
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(digits.as_bytes());
    header
}

/// Decode fixed-width header bytes into the expected body length.
///
/// Leading zeros or spaces both parse, so space-padded headers from older
/// peers are accepted. Fails for non-numeric content and for lengths above
/// [`MAX_BODY_LEN`].
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize> {
    let malformed = || ProtocolError::MalformedHeader { header: *header };
    let text = std::str::from_utf8(header).map_err(|_| malformed())?;
    let length = text.trim_start().parse::<usize>().map_err(|_| malformed())?;
    if length > MAX_BODY_LEN {
        return Err(ProtocolError::HeaderOutOfRange { length });
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_recovers_every_legal_length() {
        for len in [0, 1, 9, 10, 99, 100, 511, MAX_BODY_LEN] {
            let header = encode_header(len);
            assert_eq!(decode_header(&header).expect("legal length"), len);
        }
    }

    #[test]
    fn frame_roundtrip_preserves_body_bytes() {
        let body = b"[kinect] left".to_vec();
        let frame = Frame::new(body.clone()).expect("body within bounds");
        let wire = frame.encode();

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&wire[..HEADER_LEN]);
        let length = decode_header(&header).expect("header decodes");
        assert_eq!(length, body.len());
        assert_eq!(&wire[HEADER_LEN..], body.as_slice());
    }

    #[test]
    fn empty_body_is_a_legal_frame() {
        let frame = Frame::new(Vec::new()).expect("empty body allowed");
        assert_eq!(frame.encode().as_ref(), b"0000");
    }

    #[test]
    fn header_is_zero_padded() {
        assert_eq!(&encode_header(42), b"0042");
        assert_eq!(&encode_header(512), b"0512");
    }

    #[test]
    fn space_padded_headers_still_decode() {
        assert_eq!(decode_header(b"  42").expect("space padded"), 42);
    }

    #[test]
    fn non_numeric_header_is_rejected() {
        assert!(matches!(
            decode_header(b"abcd"),
            Err(ProtocolError::MalformedHeader { .. })
        ));
        assert!(matches!(
            decode_header(b"4 2 "),
            Err(ProtocolError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn header_above_maximum_is_rejected() {
        assert!(matches!(
            decode_header(b"0513"),
            Err(ProtocolError::HeaderOutOfRange { length: 513 })
        ));
        assert!(matches!(
            decode_header(b"9999"),
            Err(ProtocolError::HeaderOutOfRange { length: 9999 })
        ));
    }

    #[test]
    fn oversized_body_is_rejected_not_clamped() {
        let body = vec![b'x'; MAX_BODY_LEN + 1];
        assert!(matches!(
            Frame::new(body),
            Err(ProtocolError::BodyTooLarge { length }) if length == MAX_BODY_LEN + 1
        ));
    }

    #[test]
    fn body_text_rejects_non_utf8() {
        let frame = Frame::new(vec![0xff, 0xfe]).expect("within bounds");
        assert!(matches!(
            frame.body_text(),
            Err(ProtocolError::BodyNotText(_))
        ));
    }
}
