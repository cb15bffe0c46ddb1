use crate::error::WireError;

/// Fixed magic value identifying a SentinelFS frame header.
pub const MAGIC: u32 = 0x5346_5321;
/// Wire protocol version this crate implements.
pub const PROTOCOL_VERSION: u16 = 1;
/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 22;
/// Maximum payload size a single frame may carry.
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// One length-prefixed, checksummed unit of the wire protocol.
///
/// `msg_type` is kept as a raw `u16` rather than a parsed [`crate::MsgType`]
/// so a frame with an unrecognised type can still be rejected with a precise
/// error instead of failing to parse at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Message type tag; see [`crate::MsgType`].
    pub msg_type: u16,
    /// Monotonically increasing sequence number within one direction of one session.
    pub seq: u32,
    /// Reserved flag bits, currently unused by any message type.
    pub flags: u16,
    /// Message payload, laid out per [`crate::MsgType`]'s table.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Constructs a frame with no flags set.
    #[must_use]
    pub fn new(msg_type: u16, seq: u32, payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            seq,
            flags: 0,
            payload,
        }
    }

    /// Serializes the frame to its wire representation (header followed by payload).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::PayloadTooLarge`] if the payload exceeds [`MAX_PAYLOAD_LEN`].
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let payload_len = u32::try_from(self.payload.len()).map_err(|_| WireError::PayloadTooLarge {
            len: u32::MAX,
        })?;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge { len: payload_len });
        }

        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        header[4..6].copy_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        header[6..8].copy_from_slice(&self.msg_type.to_le_bytes());
        header[8..12].copy_from_slice(&payload_len.to_le_bytes());
        header[12..16].copy_from_slice(&self.seq.to_le_bytes());
        header[16..18].copy_from_slice(&self.flags.to_le_bytes());
        // header[18..22] (checksum) stays zeroed for the CRC computation below.

        let checksum = compute_checksum(&header, &self.payload);
        header[18..22].copy_from_slice(&checksum.to_le_bytes());

        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Parses a complete frame (header plus payload) from `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedPayload`] if `buf` is shorter than the
    /// declared frame length, [`WireError::PayloadTooLarge`] if the declared
    /// payload exceeds [`MAX_PAYLOAD_LEN`], and [`WireError::FrameInvalid`]
    /// if the magic, version, or checksum do not match.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::TruncatedPayload {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }

        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(WireError::FrameInvalid {
                detail: format!("bad magic 0x{magic:08x}"),
            });
        }

        let version = u16::from_le_bytes(buf[4..6].try_into().unwrap());
        if version != PROTOCOL_VERSION {
            return Err(WireError::FrameInvalid {
                detail: format!("unsupported protocol version {version}"),
            });
        }

        let msg_type = u16::from_le_bytes(buf[6..8].try_into().unwrap());
        let payload_len = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge { len: payload_len });
        }
        let seq = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let flags = u16::from_le_bytes(buf[16..18].try_into().unwrap());
        let checksum = u32::from_le_bytes(buf[18..22].try_into().unwrap());

        let total_len = HEADER_LEN + payload_len as usize;
        if buf.len() < total_len {
            return Err(WireError::TruncatedPayload {
                expected: total_len,
                actual: buf.len(),
            });
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&buf[0..HEADER_LEN]);
        header[18..22].fill(0);
        let payload = &buf[HEADER_LEN..total_len];

        let expected = compute_checksum(&header, payload);
        if expected != checksum {
            return Err(WireError::FrameInvalid {
                detail: "checksum mismatch".to_string(),
            });
        }

        Ok(Self {
            msg_type,
            seq,
            flags,
            payload: payload.to_vec(),
        })
    }
}

fn compute_checksum(header_with_zeroed_checksum: &[u8; HEADER_LEN], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header_with_zeroed_checksum);
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_fields() {
        let frame = Frame::new(0x10, 7, b"payload bytes".to_vec());
        let bytes = frame.encode().unwrap();
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut bytes = Frame::new(0x01, 1, Vec::new()).encode().unwrap();
        bytes[0] ^= 0xFF;
        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, WireError::FrameInvalid { .. }));
    }

    #[test]
    fn decode_rejects_single_bit_flip_in_payload() {
        let mut bytes = Frame::new(0x01, 1, b"hello world".to_vec()).encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, WireError::FrameInvalid { .. }));
    }

    #[test]
    fn decode_rejects_single_bit_flip_in_header() {
        let mut bytes = Frame::new(0x01, 1, b"hello world".to_vec()).encode().unwrap();
        bytes[12] ^= 0x01; // seq field
        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, WireError::FrameInvalid { .. }));
    }

    #[test]
    fn decode_reports_truncated_header() {
        let err = Frame::decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, WireError::TruncatedPayload { .. }));
    }

    #[test]
    fn decode_reports_truncated_payload() {
        let mut bytes = Frame::new(0x01, 1, b"hello world".to_vec()).encode().unwrap();
        bytes.truncate(bytes.len() - 3);
        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, WireError::TruncatedPayload { .. }));
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let frame = Frame::new(0x13, 1, vec![0u8; MAX_PAYLOAD_LEN as usize + 1]);
        let err = frame.encode().unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { .. }));
    }
}
