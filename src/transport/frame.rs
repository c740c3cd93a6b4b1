//! WebSocket frame codec.
//!
//! Encodes single-fragment frames and decodes frames from a byte buffer
//! that may hold any prefix of a frame.
//!
//! # Wire Layout
//!
//! ```text
//!  0               1               2               3
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| payload len |    extended length (16 bit)   |
//! |I|S|S|S|  (4)  |A|     (7)     |     present if len == 126     |
//! |N|V|V|V|       |S|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |          masking key (32 bit, present if MASK set)            |
//! +---------------------------------------------------------------+
//! |                          payload                              |
//! +---------------------------------------------------------------+
//! ```
//!
//! Payloads are capped at 65535 bytes in both directions: the 64-bit
//! length form is never produced and is rejected on input.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Largest payload that fits the 16-bit extended length.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest payload a control frame may carry.
const MAX_CONTROL_PAYLOAD_LEN: usize = 125;

const FIN_BIT: u8 = 0x80;
const RSV_BITS: u8 = 0x70;
const OPCODE_BITS: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LEN_BITS: u8 = 0x7F;

/// Length marker announcing a 16-bit extended length.
const LEN_MARKER_16: u8 = 126;

// ============================================================================
// Opcode
// ============================================================================

/// Frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation = 0x0,
    /// UTF-8 text message.
    Text = 0x1,
    /// Binary message.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Ping.
    Ping = 0x9,
    /// Pong.
    Pong = 0xA,
}

impl Opcode {
    /// Parses the low nibble of the first header byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    /// Returns `true` for close, ping and pong.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One WebSocket protocol data unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment of a message.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: Opcode,
    /// Whether the frame was masked on the wire.
    pub masked: bool,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a final, unmasked frame.
    #[inline]
    #[must_use]
    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin: true,
            opcode,
            masked: false,
            payload: payload.into(),
        }
    }

    /// Creates a text frame.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Opcode::Text, text.into().into_bytes())
    }

    /// Creates a pong frame echoing a ping payload.
    #[inline]
    #[must_use]
    pub fn pong(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Opcode::Pong, payload)
    }

    /// Creates a close frame with status 1000 (normal closure).
    #[inline]
    #[must_use]
    pub fn close() -> Self {
        Self::new(Opcode::Close, 1000u16.to_be_bytes())
    }

    /// Returns the payload as text if this is a valid UTF-8 text frame.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.opcode {
            Opcode::Text => std::str::from_utf8(&self.payload).ok(),
            _ => None,
        }
    }

    /// Encodes the frame, masking the payload when a key is given.
    ///
    /// Clients must pass a fresh key for every frame; servers pass `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the payload exceeds
    /// [`MAX_PAYLOAD_LEN`].
    pub fn encode(&self, mask: Option<[u8; 4]>) -> Result<Vec<u8>> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD_LEN {
            return Err(Error::payload_too_large(len, MAX_PAYLOAD_LEN));
        }

        let mut out = Vec::with_capacity(len + 8);
        let fin = if self.fin { FIN_BIT } else { 0 };
        out.push(fin | self.opcode as u8);

        let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };
        if len < usize::from(LEN_MARKER_16) {
            out.push(mask_bit | len as u8);
        } else {
            out.push(mask_bit | LEN_MARKER_16);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }

        match mask {
            Some(key) => {
                out.extend_from_slice(&key);
                let start = out.len();
                out.extend_from_slice(&self.payload);
                apply_mask(&mut out[start..], key);
            }
            None => out.extend_from_slice(&self.payload),
        }

        Ok(out)
    }

    /// Encodes the frame as a client frame with a fresh random mask key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the payload exceeds
    /// [`MAX_PAYLOAD_LEN`].
    #[inline]
    pub fn encode_masked(&self) -> Result<Vec<u8>> {
        self.encode(Some(random_mask()))
    }
}

// ============================================================================
// Masking
// ============================================================================

/// Generates a random 4-byte masking key.
#[inline]
#[must_use]
pub fn random_mask() -> [u8; 4] {
    rand::random()
}

/// XORs `data` in place with `key[i % 4]`.
///
/// Masking is its own inverse: applying the same key twice restores
/// the original bytes.
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

// ============================================================================
// Role
// ============================================================================

/// Which end of the connection is decoding.
///
/// Determines the masking rule enforced on inbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decodes server frames, which must not be masked.
    Client,
    /// Decodes client frames, which must be masked.
    Server,
}

// ============================================================================
// FrameDecoder
// ============================================================================

/// Incremental frame decoder.
///
/// Bytes are appended with [`FrameDecoder::extend`] as they arrive and
/// complete frames are taken with [`FrameDecoder::decode`]. A frame is only
/// returned once all of its bytes are buffered.
#[derive(Debug)]
pub struct FrameDecoder {
    role: Role,
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Creates a decoder for the given role.
    #[inline]
    #[must_use]
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            buf: Vec::new(),
        }
    }

    /// Creates a decoder for frames received by a client.
    #[inline]
    #[must_use]
    pub const fn client() -> Self {
        Self::new(Role::Client)
    }

    /// Creates a decoder for frames received by a server.
    #[inline]
    #[must_use]
    pub const fn server() -> Self {
        Self::new(Role::Server)
    }

    /// Appends received bytes.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes buffered but not yet decoded.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete frame.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFrameLength`] for the 64-bit length form
    /// - [`Error::Protocol`] for a masking rule violation, reserved bits,
    ///   an unknown opcode, or a malformed control frame
    pub fn decode(&mut self) -> Result<Option<Frame>> {
        let [b0, b1, ..] = self.buf[..] else {
            return Ok(None);
        };

        if b0 & RSV_BITS != 0 {
            return Err(Error::protocol("reserved header bits set"));
        }

        let fin = b0 & FIN_BIT != 0;
        let opcode = Opcode::from_u8(b0 & OPCODE_BITS)
            .ok_or_else(|| Error::protocol(format!("unknown opcode {:#x}", b0 & OPCODE_BITS)))?;

        let masked = b1 & MASK_BIT != 0;
        match (self.role, masked) {
            (Role::Client, true) => return Err(Error::protocol("server sent a masked frame")),
            (Role::Server, false) => return Err(Error::protocol("client sent an unmasked frame")),
            _ => {}
        }

        let marker = b1 & LEN_BITS;
        let (len, mut offset) = match marker {
            0..=125 => (usize::from(marker), 2),
            LEN_MARKER_16 => match self.buf.get(2..4) {
                Some(&[hi, lo]) => (usize::from(u16::from_be_bytes([hi, lo])), 4),
                _ => return Ok(None),
            },
            _ => return Err(Error::unsupported_frame_length(marker)),
        };

        if opcode.is_control() && (len > MAX_CONTROL_PAYLOAD_LEN || !fin) {
            return Err(Error::protocol(format!(
                "malformed {opcode:?} frame: len={len}, fin={fin}"
            )));
        }

        let key = if masked {
            let Some(&[k0, k1, k2, k3]) = self.buf.get(offset..offset + 4) else {
                return Ok(None);
            };
            offset += 4;
            Some([k0, k1, k2, k3])
        } else {
            None
        };

        let end = offset + len;
        if self.buf.len() < end {
            return Ok(None);
        }

        let mut payload = self.buf[offset..end].to_vec();
        if let Some(key) = key {
            apply_mask(&mut payload, key);
        }
        self.buf.drain(..end);

        Ok(Some(Frame {
            fin,
            opcode,
            masked,
            payload,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    fn payload_of(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn decode_all(decoder: &mut FrameDecoder) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.decode().expect("decode") {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_round_trip_lengths() {
        for len in [0, 1, 125, 126, 1000, 65535] {
            let frame = Frame::new(Opcode::Text, payload_of(len));
            let bytes = frame.encode_masked().expect("encode");

            let mut decoder = FrameDecoder::server();
            decoder.extend(&bytes);
            let decoded = decoder.decode().expect("decode").expect("complete frame");

            assert_eq!(decoded.payload, frame.payload, "len={len}");
            assert!(decoded.masked);
            assert!(decoded.fin);
            assert_eq!(decoder.buffered(), 0);
        }
    }

    #[test]
    fn test_header_short_length() {
        let bytes = Frame::text("hello").encode(Some(KEY)).expect("encode");

        assert_eq!(bytes[0], 0x81);
        assert_eq!(bytes[1], 0x80 | 5);
        assert_eq!(&bytes[2..6], &KEY);
        assert_eq!(bytes.len(), 2 + 4 + 5);
    }

    #[test]
    fn test_header_extended_length() {
        let bytes = Frame::new(Opcode::Text, payload_of(126))
            .encode(Some(KEY))
            .expect("encode");

        assert_eq!(bytes[1], 0x80 | 126);
        assert_eq!(&bytes[2..4], &[0x00, 0x7e]);
        assert_eq!(&bytes[4..8], &KEY);
        assert_eq!(bytes.len(), 4 + 4 + 126);
    }

    #[test]
    fn test_masked_bytes() {
        let payload = b"{\"id\":1}".to_vec();
        let bytes = Frame::new(Opcode::Text, payload.clone())
            .encode(Some(KEY))
            .expect("encode");

        let masked = &bytes[6..];
        for (i, byte) in masked.iter().enumerate() {
            assert_eq!(*byte, payload[i] ^ KEY[i % 4]);
        }
    }

    #[test]
    fn test_payload_too_large() {
        let err = Frame::new(Opcode::Text, payload_of(65536))
            .encode_masked()
            .expect_err("should reject");

        assert!(matches!(
            err,
            Error::PayloadTooLarge {
                len: 65536,
                max: 65535
            }
        ));
    }

    #[test]
    fn test_client_rejects_masked_frame() {
        let bytes = Frame::text("x").encode(Some(KEY)).expect("encode");
        let mut decoder = FrameDecoder::client();
        decoder.extend(&bytes);

        let err = decoder.decode().expect_err("masked server frame");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_server_rejects_unmasked_frame() {
        let bytes = Frame::text("x").encode(None).expect("encode");
        let mut decoder = FrameDecoder::server();
        decoder.extend(&bytes);

        assert!(decoder.decode().is_err());
    }

    #[test]
    fn test_rejects_64_bit_length() {
        let mut decoder = FrameDecoder::client();
        decoder.extend(&[0x81, 127, 0, 0, 0, 0, 0, 1, 0, 0]);

        let err = decoder.decode().expect_err("64-bit length");
        assert!(matches!(err, Error::UnsupportedFrameLength { marker: 127 }));
    }

    #[test]
    fn test_rejects_unknown_opcode() {
        let mut decoder = FrameDecoder::client();
        decoder.extend(&[0x83, 0]);
        assert!(decoder.decode().is_err());
    }

    #[test]
    fn test_decodes_continuation() {
        let mut decoder = FrameDecoder::client();
        decoder.extend(&[0x80, 2, b'h', b'i']);

        let frame = decoder.decode().expect("decode").expect("frame");
        assert_eq!(frame.opcode, Opcode::Continuation);
        assert!(frame.fin);
    }

    #[test]
    fn test_rejects_oversized_ping() {
        let mut decoder = FrameDecoder::client();
        decoder.extend(&[0x89, 126, 0, 200]);
        assert!(decoder.decode().is_err());
    }

    #[test]
    fn test_incomplete_header_waits() {
        let mut decoder = FrameDecoder::client();
        assert!(decoder.decode().expect("empty").is_none());

        decoder.extend(&[0x81]);
        assert!(decoder.decode().expect("one byte").is_none());

        decoder.extend(&[126, 0x01]);
        assert!(decoder.decode().expect("half extended length").is_none());
        assert_eq!(decoder.buffered(), 3);
    }

    #[test]
    fn test_byte_at_a_time() {
        let text = r#"{"id":1,"result":{"value":42}}"#;
        let bytes = Frame::text(text).encode(None).expect("encode");

        let mut decoder = FrameDecoder::client();
        let mut decoded = None;
        for (i, byte) in bytes.iter().enumerate() {
            decoder.extend(std::slice::from_ref(byte));
            let frame = decoder.decode().expect("decode");
            if i + 1 < bytes.len() {
                assert!(frame.is_none(), "frame returned early at byte {i}");
            } else {
                decoded = frame;
            }
        }

        let frame = decoded.expect("complete frame");
        assert_eq!(frame.as_text(), Some(text));
        assert!(!frame.masked);
    }

    #[test]
    fn test_two_frames_in_one_read() {
        let mut bytes = Frame::text("first").encode(None).expect("encode");
        bytes.extend(Frame::pong(b"p".to_vec()).encode(None).expect("encode"));
        bytes.extend(&[0x81]);

        let mut decoder = FrameDecoder::client();
        decoder.extend(&bytes);
        let frames = decode_all(&mut decoder);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_text(), Some("first"));
        assert_eq!(frames[1].opcode, Opcode::Pong);
        assert_eq!(decoder.buffered(), 1);
    }

    #[test]
    fn test_close_frame_payload() {
        assert_eq!(Frame::close().payload, vec![0x03, 0xe8]);
    }

    proptest! {
        #[test]
        fn prop_mask_is_involution(payload in prop::collection::vec(any::<u8>(), 0..512), key in any::<[u8; 4]>()) {
            let mut data = payload.clone();
            apply_mask(&mut data, key);
            for (i, byte) in data.iter().enumerate() {
                prop_assert_eq!(*byte, payload[i] ^ key[i % 4]);
            }
            apply_mask(&mut data, key);
            prop_assert_eq!(data, payload);
        }

        #[test]
        fn prop_chunked_delivery_matches_whole(
            payload in prop::collection::vec(any::<u8>(), 0..2048),
            chunks in prop::collection::vec(1usize..64, 1..64),
        ) {
            let frame = Frame::new(Opcode::Binary, payload);
            let bytes = frame.encode(None).expect("encode");

            let mut whole = FrameDecoder::client();
            whole.extend(&bytes);
            let expected = decode_all(&mut whole);

            let mut chunked = FrameDecoder::client();
            let mut frames = Vec::new();
            let mut rest = &bytes[..];
            let mut sizes = chunks.iter().cycle();
            while !rest.is_empty() {
                let size = (*sizes.next().expect("cycle")).min(rest.len());
                let (head, tail) = rest.split_at(size);
                chunked.extend(head);
                frames.extend(decode_all(&mut chunked));
                rest = tail;
            }

            prop_assert_eq!(frames, expected);
            prop_assert_eq!(chunked.buffered(), 0);
        }

        #[test]
        fn prop_masked_round_trip(payload in prop::collection::vec(any::<u8>(), 0..4096)) {
            let frame = Frame::new(Opcode::Text, payload.clone());
            let bytes = frame.encode_masked().expect("encode");

            let mut decoder = FrameDecoder::server();
            decoder.extend(&bytes);
            let decoded = decoder.decode().expect("decode").expect("complete");
            prop_assert_eq!(decoded.payload, payload);
        }
    }
}
